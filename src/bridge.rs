// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Glue between the driver, the PID resolver and the message codec.

use std::fmt;

use crate::{codec::MessageCodec, error::Error, frame::*, pid::PidResolver};

/// A request ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub pid: Pid,
    pub param_data: Vec<u8>,
}

/// Why an otherwise valid `ACK` couldn't be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    UnknownPid(Pid),
    UnknownResponse {
        command_class: CommandClass,
        name: String,
    },
    Undecodable,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownPid(pid) => write!(f, "Unknown PID: {pid}."),
            Self::UnknownResponse {
                command_class,
                name,
            } => write!(f, "Unknown response message: {command_class} {name}"),
            Self::Undecodable => f.write_str("Unable to inflate RDM response"),
        }
    }
}

#[derive(Debug)]
pub struct PidBridge<'b, R, C> {
    resolver: &'b R,
    codec: &'b C,
}

// Manual impls, `R` and `C` don't need to be `Copy`.
impl<R, C> Clone for PidBridge<'_, R, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, C> Copy for PidBridge<'_, R, C> {}

impl<'b, R, C> PidBridge<'b, R, C>
where
    R: PidResolver,
    C: MessageCodec,
{
    pub const fn new(resolver: &'b R, codec: &'b C) -> Self {
        Self { resolver, codec }
    }

    /// Resolve `pid_name`, build the message from `inputs` and serialize it.
    ///
    /// Nothing is sent if this fails.
    pub fn prepare_request(
        &self,
        pid_name: &str,
        manufacturer_id: ManufacturerId,
        command_class: CommandClass,
        inputs: &[String],
    ) -> Result<PreparedRequest, Error> {
        let descriptor = self
            .resolver
            .resolve(pid_name, manufacturer_id)
            .ok_or_else(|| Error::UnknownPid(pid_name.to_owned()))?;
        let schema = descriptor
            .request(command_class)
            .ok_or_else(|| Error::UnsupportedCommand {
                pid: pid_name.to_owned(),
                command_class,
            })?;
        let message = self
            .codec
            .build_message(schema, inputs)
            .map_err(|err| Error::InvalidArguments { schema: err.schema })?;
        Ok(PreparedRequest {
            pid: descriptor.value,
            param_data: self.codec.serialize_message(&message),
        })
    }

    /// Decode `param_data` of an `ACK` for `pid` and render it.
    pub fn render_response(
        &self,
        manufacturer_id: ManufacturerId,
        command_class: CommandClass,
        pid: Pid,
        param_data: &[u8],
    ) -> Result<String, DecodeWarning> {
        let descriptor = self
            .resolver
            .descriptor_by_value(pid, manufacturer_id)
            .ok_or(DecodeWarning::UnknownPid(pid))?;
        let schema =
            descriptor
                .response(command_class)
                .ok_or_else(|| DecodeWarning::UnknownResponse {
                    command_class,
                    name: descriptor.name.clone(),
                })?;
        let message = self
            .codec
            .deserialize_message(schema, param_data)
            .map_err(|err| {
                log::debug!("{err}");
                DecodeWarning::Undecodable
            })?;
        Ok(self
            .codec
            .pretty_print_message(manufacturer_id, command_class.is_set(), pid, &message))
    }
}
