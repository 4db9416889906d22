// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message codec interface.
//!
//! The parameter data encoding lives outside this crate, the driver only
//! needs to build, serialize, decode and display messages.

use std::fmt;

use crate::{
    frame::{ManufacturerId, Pid},
    pid::Descriptor,
};

/// The inputs didn't match the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    /// Textual form of the expected schema.
    pub schema: String,
}

impl BuildError {
    #[must_use]
    pub fn new(schema: &Descriptor) -> Self {
        Self {
            schema: schema.to_string(),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Arguments don't match schema: {}", self.schema)
    }
}

impl std::error::Error for BuildError {}

/// The parameter data couldn't be decoded against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Failed to decode parameter data: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

/// Builds, serializes, decodes and displays typed messages.
pub trait MessageCodec {
    type Message;

    /// Build a message from user supplied strings.
    fn build_message(
        &self,
        schema: &Descriptor,
        inputs: &[String],
    ) -> Result<Self::Message, BuildError>;

    fn serialize_message(&self, message: &Self::Message) -> Vec<u8>;

    fn deserialize_message(
        &self,
        schema: &Descriptor,
        param_data: &[u8],
    ) -> Result<Self::Message, DecodeError>;

    /// Human readable rendering of a decoded response.
    fn pretty_print_message(
        &self,
        manufacturer_id: ManufacturerId,
        is_set: bool,
        pid: Pid,
        message: &Self::Message,
    ) -> String;
}
