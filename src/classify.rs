// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of raw response statuses.

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

use crate::frame::*;

/// `ACK_TIMER` estimates are expressed in tenths of a second.
const ACK_TIMER_UNIT: Duration = Duration::from_millis(100);

/// What a single response means for the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome<'r> {
    /// The request didn't reach a device.
    TransportError(&'r str),
    /// The request was broadcast, no device replies.
    Broadcast,
    /// The transport received something that isn't a valid reply.
    ProtocolError(ResponseCode),
    /// The device asks to fetch the answer later.
    AckTimer(Duration),
    Ack { pid: Pid, param_data: &'r [u8] },
    NackReason(NackReason),
    /// A response type the driver doesn't handle.
    UnknownType(u8),
}

/// Map a raw response status to exactly one [`ResponseOutcome`].
#[must_use]
pub fn classify(status: &ResponseStatus) -> ResponseOutcome<'_> {
    use ResponseOutcome as O;

    if !status.error.is_empty() {
        return O::TransportError(&status.error);
    }
    match status.response_code {
        ResponseCode::CompletedOk => {}
        ResponseCode::WasBroadcast => return O::Broadcast,
        code => return O::ProtocolError(code),
    }
    match status.response_type {
        ResponseType::Ack => O::Ack {
            pid: status.pid,
            param_data: status.payload(),
        },
        ResponseType::AckTimer => read_word(status.payload())
            .map_or(O::ProtocolError(ResponseCode::InvalidResponse), |units| {
                O::AckTimer(ACK_TIMER_UNIT * u32::from(units))
            }),
        ResponseType::NackReason => read_word(status.payload())
            .map_or(O::ProtocolError(ResponseCode::InvalidResponse), |code| {
                O::NackReason(NackReason::new(code))
            }),
        tag @ (ResponseType::AckOverflow | ResponseType::Unknown(_)) => O::UnknownType(tag.value()),
    }
}

/// The single big-endian word carried by `ACK_TIMER` and `NACK_REASON`.
fn read_word(param_data: &[u8]) -> Option<u16> {
    (param_data.len() == 2).then(|| BigEndian::read_u16(param_data))
}
