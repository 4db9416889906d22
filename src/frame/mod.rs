// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

mod uid;

pub use self::uid::*;

/// An RDM parameter ID is represented by an unsigned 16 bit integer.
pub type Pid = u16;

/// `QUEUED_MESSAGE` (`0x0020`).
pub const PID_QUEUED_MESSAGE: Pid = 0x0020;

/// `STATUS_MESSAGES` (`0x0030`).
pub const PID_STATUS_MESSAGES: Pid = 0x0030;

/// Status type `STATUS_ERROR`, requested when fetching queued messages.
pub const STATUS_ERROR: u8 = 0x04;

/// Universe (group) the target device is patched to.
pub type Universe = u32;

/// Index of a sub device, `0` is the root device.
pub type SubDevice = u16;

/// Raw parameter data
type RawData<'r> = &'r [u8];

/// The command class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    Get,
    Set,
}

impl CommandClass {
    #[must_use]
    pub const fn new(is_set: bool) -> Self {
        if is_set { Self::Set } else { Self::Get }
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        matches!(self, Self::Set)
    }
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Set => f.write_str("SET"),
        }
    }
}

/// The response type of a response message.
///
/// It is represented by an unsigned 8 bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// `ACK` (`0x00`).
    Ack,

    /// `ACK_TIMER` (`0x01`).
    AckTimer,

    /// `NACK_REASON` (`0x02`).
    NackReason,

    /// `ACK_OVERFLOW` (`0x03`).
    AckOverflow,

    /// Any other tag.
    Unknown(u8),
}

impl ResponseType {
    /// Create a new [`ResponseType`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x00 => Self::Ack,
            0x01 => Self::AckTimer,
            0x02 => Self::NackReason,
            0x03 => Self::AckOverflow,
            tag => Self::Unknown(tag),
        }
    }

    /// Get the [`u8`] value of the current [`ResponseType`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Ack => 0x00,
            Self::AckTimer => 0x01,
            Self::NackReason => 0x02,
            Self::AckOverflow => 0x03,
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<u8> for ResponseType {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// The outcome of a request as reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    CompletedOk,
    WasBroadcast,
    FailedToSend,
    Timeout,
    InvalidResponse,
    UnknownUid,
    ChecksumIncorrect,
    TransactionMismatch,
    SubDeviceMismatch,
    SrcUidMismatch,
    DestUidMismatch,
    WrongSubStartCode,
    PacketTooShort,
    PacketLengthMismatch,
    ParamLengthMismatch,
    InvalidCommandClass,
    CommandClassMismatch,
    InvalidResponseType,
    DiscoveryNotSupported,
    DubResponse,
}

impl ResponseCode {
    const fn get_name(self) -> &'static str {
        match self {
            Self::CompletedOk => "Completed Ok",
            Self::WasBroadcast => "Request was broadcast",
            Self::FailedToSend => "Failed to send request",
            Self::Timeout => "Response Timeout",
            Self::InvalidResponse => "Invalid Response",
            Self::UnknownUid => "Unknown UID",
            Self::ChecksumIncorrect => "Incorrect checksum",
            Self::TransactionMismatch => "Transaction number mismatch",
            Self::SubDeviceMismatch => "Sub device mismatch",
            Self::SrcUidMismatch => "Source UID in response doesn't match",
            Self::DestUidMismatch => "Destination UID in response doesn't match",
            Self::WrongSubStartCode => "Incorrect sub start code",
            Self::PacketTooShort => "RDM response was smaller than the minimum size",
            Self::PacketLengthMismatch => {
                "The length field of packet didn't match length received"
            }
            Self::ParamLengthMismatch => "The parameter length exceeds the remaining packet size",
            Self::InvalidCommandClass => {
                "The command class was not one of GET_RESPONSE or SET_RESPONSE"
            }
            Self::CommandClassMismatch => "The command class didn't match the request",
            Self::InvalidResponseType => {
                "The response type was not ACK, ACK_OVERFLOW, ACK_TIMER or NACK"
            }
            Self::DiscoveryNotSupported => "The output plugin does not support DISCOVERY commands",
            Self::DubResponse => "DUB response",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_name())
    }
}

/// The reason code of a `NACK_REASON` response.
///
/// It is represented by an unsigned 16 bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackReason {
    UnknownPid,
    FormatError,
    HardwareFault,
    ProxyReject,
    WriteProtect,
    UnsupportedCommandClass,
    DataOutOfRange,
    BufferFull,
    PacketSizeUnsupported,
    SubDeviceOutOfRange,
    ProxyBufferFull,
    Unknown(u16),
}

impl NackReason {
    /// Create a new [`NackReason`] with `value`.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        match value {
            0x0000 => Self::UnknownPid,
            0x0001 => Self::FormatError,
            0x0002 => Self::HardwareFault,
            0x0003 => Self::ProxyReject,
            0x0004 => Self::WriteProtect,
            0x0005 => Self::UnsupportedCommandClass,
            0x0006 => Self::DataOutOfRange,
            0x0007 => Self::BufferFull,
            0x0008 => Self::PacketSizeUnsupported,
            0x0009 => Self::SubDeviceOutOfRange,
            0x000A => Self::ProxyBufferFull,
            code => Self::Unknown(code),
        }
    }

    /// Get the [`u16`] value of the current [`NackReason`].
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::UnknownPid => 0x0000,
            Self::FormatError => 0x0001,
            Self::HardwareFault => 0x0002,
            Self::ProxyReject => 0x0003,
            Self::WriteProtect => 0x0004,
            Self::UnsupportedCommandClass => 0x0005,
            Self::DataOutOfRange => 0x0006,
            Self::BufferFull => 0x0007,
            Self::PacketSizeUnsupported => 0x0008,
            Self::SubDeviceOutOfRange => 0x0009,
            Self::ProxyBufferFull => 0x000A,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownPid => f.write_str("Unknown PID"),
            Self::FormatError => f.write_str("Format error"),
            Self::HardwareFault => f.write_str("Hardware fault"),
            Self::ProxyReject => f.write_str("Proxy reject"),
            Self::WriteProtect => f.write_str("Write protect"),
            Self::UnsupportedCommandClass => f.write_str("Unsupported command class"),
            Self::DataOutOfRange => f.write_str("Data out of range"),
            Self::BufferFull => f.write_str("Buffer full"),
            Self::PacketSizeUnsupported => f.write_str("Packet size unsupported"),
            Self::SubDeviceOutOfRange => f.write_str("Sub device out of range"),
            Self::ProxyBufferFull => f.write_str("Proxy buffer full"),
            Self::Unknown(code) => write!(f, "Unknown, was 0x{code:0>4X}"),
        }
    }
}

/// A request submitted to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmRequest {
    pub universe: Universe,
    pub uid: Uid,
    pub sub_device: SubDevice,
    pub pid: Pid,
    pub param_data: Vec<u8>,
}

/// The raw completion status of a submitted request.
///
/// Fields beyond `error` and `response_code` are only meaningful if the
/// transport completed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    /// Transport level error text, empty on success.
    pub error: String,
    pub response_code: ResponseCode,
    pub response_type: ResponseType,
    /// Number of messages the device still has queued.
    pub message_count: u8,
    pub command_class: CommandClass,
    pub pid: Pid,
    pub param_data: Vec<u8>,
}

impl ResponseStatus {
    /// A completed response of `response_type` for `pid`.
    #[must_use]
    pub fn new(
        response_type: ResponseType,
        command_class: CommandClass,
        pid: Pid,
        param_data: Vec<u8>,
    ) -> Self {
        Self {
            error: String::new(),
            response_code: ResponseCode::CompletedOk,
            response_type,
            message_count: 0,
            command_class,
            pid,
            param_data,
        }
    }

    /// A response that never reached a device.
    #[must_use]
    pub fn transport_error(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::with_code(ResponseCode::FailedToSend)
        }
    }

    /// A response that carries no device reply.
    #[must_use]
    pub fn with_code(response_code: ResponseCode) -> Self {
        Self {
            response_code,
            ..Self::new(ResponseType::Ack, CommandClass::Get, 0, Vec::new())
        }
    }

    #[must_use]
    pub fn with_message_count(mut self, message_count: u8) -> Self {
        self.message_count = message_count;
        self
    }

    /// Parameter data as borrowed slice.
    #[must_use]
    pub fn payload(&self) -> RawData<'_> {
        &self.param_data
    }
}
