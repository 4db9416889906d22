// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the external collaborators.

use std::collections::VecDeque;

use crate::{
    codec::{BuildError, DecodeError, MessageCodec},
    frame::*,
    pid::Descriptor,
    reactor::{Completion, RdmConnection},
};

/// Treats every field as plain text, one input per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    name: String,
    values: Vec<String>,
}

impl MessageCodec for TextCodec {
    type Message = TextMessage;

    fn build_message(
        &self,
        schema: &Descriptor,
        inputs: &[String],
    ) -> Result<Self::Message, BuildError> {
        if inputs.len() != schema.fields.len() {
            return Err(BuildError::new(schema));
        }
        Ok(TextMessage {
            name: schema.name.clone(),
            values: inputs.to_vec(),
        })
    }

    fn serialize_message(&self, message: &Self::Message) -> Vec<u8> {
        message.values.join(" ").into_bytes()
    }

    fn deserialize_message(
        &self,
        schema: &Descriptor,
        param_data: &[u8],
    ) -> Result<Self::Message, DecodeError> {
        let text = std::str::from_utf8(param_data).map_err(|err| DecodeError(err.to_string()))?;
        let values = if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_owned()]
        };
        Ok(TextMessage {
            name: schema.name.clone(),
            values,
        })
    }

    fn pretty_print_message(
        &self,
        _manufacturer_id: ManufacturerId,
        _is_set: bool,
        _pid: Pid,
        message: &Self::Message,
    ) -> String {
        format!("{}: {}\n", message.name, message.values.join(" "))
    }
}

/// Answers requests from a script, in order.
///
/// Once the script is exhausted completions are dropped unanswered.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    responses: VecDeque<ResponseStatus>,
    requests: Vec<(CommandClass, RdmRequest)>,
}

impl ScriptedConnection {
    pub fn new(responses: impl IntoIterator<Item = ResponseStatus>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    pub fn requests(&self) -> &[(CommandClass, RdmRequest)] {
        &self.requests
    }

    fn answer(&mut self, command_class: CommandClass, request: RdmRequest, on_complete: Completion) {
        self.requests.push((command_class, request));
        if let Some(status) = self.responses.pop_front() {
            on_complete.complete(status);
        }
    }
}

impl RdmConnection for ScriptedConnection {
    fn rdm_get(&mut self, request: RdmRequest, on_complete: Completion) {
        self.answer(CommandClass::Get, request, on_complete);
    }

    fn rdm_set(&mut self, request: RdmRequest, on_complete: Completion) {
        self.answer(CommandClass::Set, request, on_complete);
    }
}

pub fn ack(pid: Pid, param_data: &[u8]) -> ResponseStatus {
    ResponseStatus::new(ResponseType::Ack, CommandClass::Get, pid, param_data.to_vec())
}

/// `ACK_TIMER` asking to come back after `tenths` * 100ms.
pub fn ack_timer(pid: Pid, tenths: u16) -> ResponseStatus {
    ResponseStatus::new(
        ResponseType::AckTimer,
        CommandClass::Get,
        pid,
        tenths.to_be_bytes().to_vec(),
    )
}

pub fn nack(pid: Pid, reason: u16) -> ResponseStatus {
    ResponseStatus::new(
        ResponseType::NackReason,
        CommandClass::Get,
        pid,
        reason.to_be_bytes().to_vec(),
    )
}
