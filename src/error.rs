// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, io};

use crate::{cli::ExitStatus, frame::CommandClass};

/// rdm-client Error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Neither the name nor the numeric value matched a known PID
    UnknownPid(String),
    /// The PID has no request schema for this command class
    UnsupportedCommand {
        pid: String,
        command_class: CommandClass,
    },
    /// The inputs don't fit the request schema
    InvalidArguments {
        /// Textual form of the expected schema
        schema: String,
    },
    /// Malformed UID string
    InvalidUid(String),
    /// A required command line argument is missing
    MissingArgument(&'static str),
    /// The PID store could not be loaded
    PidStore(String),
    /// The connection could not be established
    Connection(String),
    /// The transport reported an error for a request
    Transport(String),
    /// Writing the report or starting the runtime failed
    Io(io::ErrorKind),
}

impl Error {
    /// The process exit status this error maps to.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        use Error::*;

        match self {
            UnknownPid(_)
            | UnsupportedCommand { .. }
            | InvalidArguments { .. }
            | InvalidUid(_)
            | MissingArgument(_) => ExitStatus::Usage,
            PidStore(_) => ExitStatus::DataError,
            Connection(_) | Transport(_) | Io(_) => ExitStatus::Unavailable,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            UnknownPid(name) => write!(f, "Unknown PID: {name}"),
            UnsupportedCommand { pid, command_class } => {
                write!(f, "{command_class} command not supported for {pid}")
            }
            InvalidArguments { schema } => write!(f, "Invalid arguments, expected: {schema}"),
            InvalidUid(uid) => write!(f, "Invalid UID: {uid}, try xxxx:yyyyyyyy"),
            MissingArgument(what) => write!(f, "Missing {what}"),
            PidStore(reason) => write!(f, "Failed to load PID store: {reason}"),
            Connection(reason) => write!(f, "Setup failed: {reason}"),
            Transport(reason) => write!(f, "Transport error: {reason}"),
            Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind())
    }
}
