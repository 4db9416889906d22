// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives a single GET or SET transaction to completion.

use std::{io::Write, time::Duration};

use crate::{
    bridge::PidBridge,
    classify::{ResponseOutcome, classify},
    codec::MessageCodec,
    error::Error,
    frame::*,
    pid::PidResolver,
    reactor::{Event, EventLoop, RdmConnection, TimeoutKind},
};

const SEPARATOR: &str = "-----------------------------------------------------";

/// How the device answered the transaction.
///
/// Transport failures are reported as [`Error::Transport`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// The device acknowledged the request.
    Completed,
    /// The device answered with an empty `STATUS_MESSAGES`, it likely
    /// doesn't support queued messages.
    EmptyStatusMessages,
    /// The request was broadcast, there is no reply.
    Broadcast,
    ProtocolError(ResponseCode),
    Nacked(NackReason),
    UnknownResponseType(u8),
    /// The caller's deadline passed before the transaction finished.
    TimedOut,
}

/// The kind of request currently waiting for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Original,
    QueuedMessageFetch,
}

/// Correlates responses with the request of the running transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest<'u> {
    pub universe: Universe,
    pub uid: &'u Uid,
    pub sub_device: SubDevice,
    /// The PID that was originally requested.
    pub pid: Pid,
    pub in_flight: Submission,
}

impl PendingRequest<'_> {
    /// Whether an `ACK` for `pid` answers the request instead of
    /// signalling more queued messages.
    #[must_use]
    pub fn is_answered_by(&self, pid: Pid) -> bool {
        pid == self.pid
            || self.pid == PID_QUEUED_MESSAGE
            || (self.in_flight == Submission::QueuedMessageFetch && pid == PID_QUEUED_MESSAGE)
    }
}

/// Issues requests against one device and reports the replies to `out`.
#[derive(Debug)]
pub struct RdmController<R, C, T, W> {
    resolver: R,
    codec: C,
    connection: T,
    out: W,
    timeout: Option<Duration>,
}

impl<R, C, T, W> RdmController<R, C, T, W>
where
    R: PidResolver,
    C: MessageCodec,
    T: RdmConnection,
    W: Write,
{
    pub const fn new(resolver: R, codec: C, connection: T, out: W) -> Self {
        Self {
            resolver,
            codec,
            connection,
            out,
            timeout: None,
        }
    }

    /// Give up on a transaction that didn't finish within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn connection(&self) -> &T {
        &self.connection
    }

    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Send a request and wait until the transaction finished.
    ///
    /// Queued messages reported by the device are fetched one by one
    /// before the transaction completes.
    pub async fn perform_request_and_wait(
        &mut self,
        universe: Universe,
        uid: &Uid,
        sub_device: SubDevice,
        pid_name: &str,
        is_set: bool,
        inputs: &[String],
    ) -> Result<TransactionStatus, Error> {
        let command_class = CommandClass::new(is_set);
        let bridge = PidBridge::new(&self.resolver, &self.codec);
        let request =
            bridge.prepare_request(pid_name, uid.manufacturer_id(), command_class, inputs)?;

        let mut transaction = Transaction {
            bridge,
            connection: &mut self.connection,
            out: &mut self.out,
            pending: PendingRequest {
                universe,
                uid,
                sub_device,
                pid: request.pid,
                in_flight: Submission::Original,
            },
            event_loop: EventLoop::new(),
            outcome: None,
        };
        transaction.submit(command_class, request.pid, request.param_data);
        if let Some(timeout) = self.timeout {
            transaction
                .event_loop
                .register_single_timeout(timeout, TimeoutKind::Abort);
        }
        transaction.run().await
    }
}

struct Transaction<'t, R, C, T, W> {
    bridge: PidBridge<'t, R, C>,
    connection: &'t mut T,
    out: &'t mut W,
    pending: PendingRequest<'t>,
    event_loop: EventLoop,
    outcome: Option<Result<TransactionStatus, Error>>,
}

impl<R, C, T, W> Transaction<'_, R, C, T, W>
where
    R: PidResolver,
    C: MessageCodec,
    T: RdmConnection,
    W: Write,
{
    async fn run(mut self) -> Result<TransactionStatus, Error> {
        while let Some(event) = self.event_loop.next_event().await {
            let handled = match event {
                Event::Response(status) => self.handle_response(&status),
                Event::Timeout(TimeoutKind::AckTimer) => {
                    self.fetch_queued_message();
                    Ok(())
                }
                Event::Timeout(TimeoutKind::Abort) => self.abort(),
            };
            if let Err(err) = handled {
                self.fail(err);
            }
        }
        debug_assert_eq!(self.event_loop.terminations(), 1);
        self.outcome
            .take()
            .unwrap_or_else(|| Err(Error::Transport("event loop stopped".to_owned())))
    }

    fn handle_response(&mut self, status: &ResponseStatus) -> Result<(), Error> {
        use ResponseOutcome as O;

        let outcome = match classify(status) {
            O::TransportError(error) => {
                log::error!("RDM request failed: {error}");
                self.finish(Err(Error::Transport(error.to_owned())));
                writeln!(self.out, "Error: {error}")?;
                return Ok(());
            }
            O::Broadcast => {
                self.finish(Ok(TransactionStatus::Broadcast));
                return Ok(());
            }
            O::ProtocolError(code) => {
                writeln!(self.out, "Error: {code}")?;
                self.finish(Ok(TransactionStatus::ProtocolError(code)));
                return Ok(());
            }
            O::AckTimer(delay) => {
                self.event_loop
                    .register_single_timeout(delay, TimeoutKind::AckTimer);
                return Ok(());
            }
            O::Ack { pid, param_data } => {
                if self.pending.is_answered_by(pid) {
                    self.handle_ack(status.command_class, pid, param_data)?;
                    TransactionStatus::Completed
                } else if pid != PID_STATUS_MESSAGES || !param_data.is_empty() {
                    // Something other than an empty status message, the
                    // device has more messages queued.
                    self.fetch_queued_message();
                    return Ok(());
                } else {
                    writeln!(self.out, "Empty STATUS_MESSAGES returned.")?;
                    TransactionStatus::EmptyStatusMessages
                }
            }
            O::NackReason(reason) => {
                writeln!(self.out, "Request NACKed: {reason}")?;
                TransactionStatus::Nacked(reason)
            }
            O::UnknownType(tag) => {
                writeln!(self.out, "Unknown RDM response type {tag:x}")?;
                TransactionStatus::UnknownResponseType(tag)
            }
        };
        self.print_remaining_messages(status.message_count)?;
        self.finish(Ok(outcome));
        Ok(())
    }

    fn abort(&mut self) -> Result<(), Error> {
        writeln!(self.out, "Error: request timed out")?;
        self.finish(Ok(TransactionStatus::TimedOut));
        Ok(())
    }

    fn handle_ack(
        &mut self,
        command_class: CommandClass,
        pid: Pid,
        param_data: &[u8],
    ) -> Result<(), Error> {
        let manufacturer_id = self.pending.uid.manufacturer_id();
        match self
            .bridge
            .render_response(manufacturer_id, command_class, pid, param_data)
        {
            Ok(text) => write!(self.out, "{text}")?,
            Err(warning) => log::warn!("{warning}"),
        }
        Ok(())
    }

    fn fetch_queued_message(&mut self) {
        self.pending.in_flight = Submission::QueuedMessageFetch;
        self.submit(CommandClass::Get, PID_QUEUED_MESSAGE, vec![STATUS_ERROR]);
    }

    fn submit(&mut self, command_class: CommandClass, pid: Pid, param_data: Vec<u8>) {
        let request = RdmRequest {
            universe: self.pending.universe,
            uid: *self.pending.uid,
            sub_device: self.pending.sub_device,
            pid,
            param_data,
        };
        log::debug!(
            "{command_class} 0x{pid:0>4X} to {} (universe {}, sub device {})",
            request.uid,
            request.universe,
            request.sub_device
        );
        let on_complete = self.event_loop.completion();
        match command_class {
            CommandClass::Get => self.connection.rdm_get(request, on_complete),
            CommandClass::Set => self.connection.rdm_set(request, on_complete),
        }
    }

    fn print_remaining_messages(&mut self, message_count: u8) -> Result<(), Error> {
        if message_count == 0 {
            return Ok(());
        }
        writeln!(self.out, "{SEPARATOR}")?;
        writeln!(self.out, "Messages remaining: {message_count}")?;
        Ok(())
    }

    fn finish(&mut self, outcome: Result<TransactionStatus, Error>) {
        self.outcome = Some(outcome);
        self.event_loop.terminate();
    }

    /// Stop on a local failure unless the transaction already finished.
    fn fail(&mut self, err: Error) {
        if self.outcome.is_none() {
            self.finish(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::{ALL_DEVICES, ResponseCode},
        mock::{ScriptedConnection, TextCodec, ack, ack_timer, nack},
        pid::PidStore,
    };

    const UID: Uid = Uid::new(0x7A70, 0x0000_0001);

    type Controller = RdmController<PidStore, TextCodec, ScriptedConnection, Vec<u8>>;

    fn controller(responses: Vec<ResponseStatus>) -> Controller {
        RdmController::new(
            PidStore::with_standard_pids(),
            TextCodec,
            ScriptedConnection::new(responses),
            Vec::new(),
        )
    }

    fn output(controller: &Controller) -> String {
        String::from_utf8(controller.output().clone()).unwrap()
    }

    async fn get(controller: &mut Controller, pid: &str) -> Result<TransactionStatus, Error> {
        controller
            .perform_request_and_wait(1, &UID, 0, pid, false, &[])
            .await
    }

    #[tokio::test]
    async fn ack_is_decoded_and_printed() {
        let mut c = controller(vec![ack(0x0082, b"booth")]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert_eq!(output(&c), "DEVICE_LABEL: booth\n");
        let sent = c.connection().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CommandClass::Get);
        assert_eq!(
            sent[0].1,
            RdmRequest {
                universe: 1,
                uid: UID,
                sub_device: 0,
                pid: 0x0082,
                param_data: vec![]
            }
        );
    }

    #[tokio::test]
    async fn set_request_uses_set_primitive() {
        let mut c = controller(vec![ResponseStatus::new(
            ResponseType::Ack,
            CommandClass::Set,
            0x00F0,
            vec![],
        )]);
        let status = c
            .perform_request_and_wait(3, &UID, 2, "dmx_start_address", true, &["12".into()])
            .await;
        assert_eq!(status, Ok(TransactionStatus::Completed));
        let sent = c.connection().requests();
        assert_eq!(sent[0].0, CommandClass::Set);
        assert_eq!(sent[0].1.universe, 3);
        assert_eq!(sent[0].1.sub_device, 2);
        assert_eq!(sent[0].1.param_data, b"12");
        assert_eq!(output(&c), "DMX_START_ADDRESS: \n");
    }

    #[tokio::test]
    async fn malformed_arguments_send_nothing() {
        let mut c = controller(vec![]);
        let err = c
            .perform_request_and_wait(1, &UID, 0, "dmx_start_address", true, &[])
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            Error::InvalidArguments {
                schema: "dmx_address: uint16\n".into()
            }
        );
        let err = c
            .perform_request_and_wait(1, &UID, 0, "device_label", true, &["a".into(), "b".into()])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidArguments { .. }));
        assert!(c.connection().requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_or_unsupported_pid_sends_nothing() {
        let mut c = controller(vec![]);
        assert_eq!(
            get(&mut c, "no_such_pid").await,
            Err(Error::UnknownPid("no_such_pid".into()))
        );
        assert!(matches!(
            get(&mut c, "reset_device").await,
            Err(Error::UnsupportedCommand { .. })
        ));
        assert!(c.connection().requests().is_empty());
    }

    #[tokio::test]
    async fn broadcast_prints_nothing() {
        let mut c = controller(vec![ResponseStatus::with_code(ResponseCode::WasBroadcast)]);
        let uid = Uid::new(0x7A70, ALL_DEVICES);
        let status = c
            .perform_request_and_wait(1, &uid, 0, "identify_device", true, &["1".into()])
            .await;
        assert_eq!(status, Ok(TransactionStatus::Broadcast));
        assert!(output(&c).is_empty());
    }

    #[tokio::test]
    async fn transport_error_fails_transaction() {
        let mut c = controller(vec![ResponseStatus::transport_error("olad went away")]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Err(Error::Transport("olad went away".into()))
        );
        assert_eq!(output(&c), "Error: olad went away\n");
    }

    #[tokio::test]
    async fn missing_response_fails_transaction() {
        let mut c = controller(vec![]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Err(Error::Transport("request dropped".into()))
        );
    }

    #[tokio::test]
    async fn protocol_error_is_reported() {
        let mut c = controller(vec![
            ResponseStatus::with_code(ResponseCode::Timeout).with_message_count(3),
        ]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::ProtocolError(ResponseCode::Timeout))
        );
        assert_eq!(output(&c), "Error: Response Timeout\n");
    }

    #[tokio::test(start_paused = true)]
    async fn ack_timer_then_queued_message() {
        let mut c = controller(vec![
            ack_timer(0x0082, 5),
            ack(PID_QUEUED_MESSAGE, b""),
        ]);
        let start = tokio::time::Instant::now();
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert!(start.elapsed() >= Duration::from_millis(500));
        let sent = c.connection().requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, CommandClass::Get);
        assert_eq!(sent[1].1.pid, PID_QUEUED_MESSAGE);
        assert_eq!(sent[1].1.param_data, vec![STATUS_ERROR]);
        assert_eq!(output(&c), "QUEUED_MESSAGE: \n");
    }

    #[tokio::test(start_paused = true)]
    async fn ack_timer_then_original_pid() {
        let mut c = controller(vec![ack_timer(0x0082, 1), ack(0x0082, b"booth")]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert_eq!(c.connection().requests().len(), 2);
        assert_eq!(output(&c), "DEVICE_LABEL: booth\n");
    }

    #[tokio::test]
    async fn drain_queued_messages() {
        const N: usize = 3;
        let mut responses: Vec<_> = (0..N).map(|_| ack(0x0060, b"info")).collect();
        responses.push(ack(0x0082, b"booth"));
        let mut c = controller(responses);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        let sent = c.connection().requests();
        assert_eq!(sent.len(), N + 1);
        assert!(
            sent[1..]
                .iter()
                .all(|(class, req)| *class == CommandClass::Get
                    && req.pid == PID_QUEUED_MESSAGE
                    && req.uid == UID)
        );
        assert_eq!(output(&c), "DEVICE_LABEL: booth\n");
    }

    #[tokio::test]
    async fn empty_status_messages_stops_draining() {
        let mut c = controller(vec![ack(PID_STATUS_MESSAGES, b"")]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::EmptyStatusMessages)
        );
        assert_eq!(c.connection().requests().len(), 1);
        assert_eq!(output(&c), "Empty STATUS_MESSAGES returned.\n");
    }

    #[tokio::test]
    async fn status_messages_with_payload_keeps_draining() {
        let mut c = controller(vec![
            ack(PID_STATUS_MESSAGES, b"overheat"),
            ack(0x0082, b"booth"),
        ]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert_eq!(c.connection().requests().len(), 2);
    }

    #[tokio::test]
    async fn queued_message_request_is_answered_by_any_pid() {
        let mut c = controller(vec![ack(0x0082, b"booth")]);
        let status = c
            .perform_request_and_wait(1, &UID, 0, "queued_message", false, &["4".into()])
            .await;
        assert_eq!(status, Ok(TransactionStatus::Completed));
        assert_eq!(c.connection().requests().len(), 1);
        assert_eq!(output(&c), "DEVICE_LABEL: booth\n");
    }

    #[tokio::test]
    async fn nack_prints_reason_and_remaining_messages() {
        let mut c = controller(vec![nack(0x0082, 0x0004).with_message_count(2)]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Nacked(NackReason::WriteProtect))
        );
        assert_eq!(
            output(&c),
            format!("Request NACKed: Write protect\n{SEPARATOR}\nMessages remaining: 2\n")
        );
    }

    #[tokio::test]
    async fn unknown_response_type() {
        let mut status = ack(0x0082, b"");
        status.response_type = ResponseType::AckOverflow;
        let mut c = controller(vec![status]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::UnknownResponseType(0x03))
        );
        assert_eq!(output(&c), "Unknown RDM response type 3\n");
    }

    #[tokio::test]
    async fn ack_prints_remaining_messages() {
        let mut c = controller(vec![ack(0x0082, b"booth").with_message_count(4)]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert_eq!(
            output(&c),
            format!("DEVICE_LABEL: booth\n{SEPARATOR}\nMessages remaining: 4\n")
        );
    }

    #[tokio::test]
    async fn empty_status_messages_prints_remaining_messages() {
        let mut c = controller(vec![ack(PID_STATUS_MESSAGES, b"").with_message_count(1)]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::EmptyStatusMessages)
        );
        assert_eq!(
            output(&c),
            format!("Empty STATUS_MESSAGES returned.\n{SEPARATOR}\nMessages remaining: 1\n")
        );
    }

    #[tokio::test]
    async fn unknown_response_type_prints_remaining_messages() {
        let mut status = ack(0x0082, b"").with_message_count(7);
        status.response_type = ResponseType::new(0x42);
        let mut c = controller(vec![status]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::UnknownResponseType(0x42))
        );
        assert_eq!(
            output(&c),
            format!("Unknown RDM response type 42\n{SEPARATOR}\nMessages remaining: 7\n")
        );
    }

    #[tokio::test]
    async fn nack_without_reason_is_invalid_response() {
        let mut status = nack(0x0082, 0);
        status.param_data.clear();
        let mut c = controller(vec![status]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::ProtocolError(ResponseCode::InvalidResponse))
        );
        assert_eq!(output(&c), "Error: Invalid Response\n");
    }

    #[tokio::test(start_paused = true)]
    async fn truncated_ack_timer_is_not_retried() {
        let mut truncated = ack_timer(0x0082, 10);
        truncated.param_data.truncate(1);
        let mut c = controller(vec![
            truncated.clone(),
            truncated.clone(),
            truncated,
            ack(0x0082, b"booth"),
        ]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::ProtocolError(ResponseCode::InvalidResponse))
        );
        assert_eq!(c.connection().requests().len(), 1);
    }

    #[derive(Debug)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn transport_error_survives_failed_report() {
        let mut c = RdmController::new(
            PidStore::with_standard_pids(),
            TextCodec,
            ScriptedConnection::new([ResponseStatus::transport_error("olad went away")]),
            BrokenPipe,
        );
        let status = c
            .perform_request_and_wait(1, &UID, 0, "device_label", false, &[])
            .await;
        assert_eq!(status, Err(Error::Transport("olad went away".into())));
    }

    #[tokio::test]
    async fn failed_report_ends_transaction() {
        let mut c = RdmController::new(
            PidStore::with_standard_pids(),
            TextCodec,
            ScriptedConnection::new([nack(0x0082, 0x0004)]),
            BrokenPipe,
        );
        let status = c
            .perform_request_and_wait(1, &UID, 0, "device_label", false, &[])
            .await;
        assert_eq!(status, Err(Error::Io(std::io::ErrorKind::BrokenPipe)));
    }

    #[tokio::test]
    async fn undecodable_ack_is_not_fatal() {
        let mut c = controller(vec![ack(0x0082, &[0xC3, 0x28])]);
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::Completed)
        );
        assert!(output(&c).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_after_timeout() {
        // The device keeps asking to come back later.
        let responses = (0..100).map(|_| ack_timer(0x0082, 10)).collect();
        let mut c = controller(responses).with_timeout(Duration::from_millis(2500));
        assert_eq!(
            get(&mut c, "device_label").await,
            Ok(TransactionStatus::TimedOut)
        );
        assert_eq!(c.connection().requests().len(), 3);
        assert_eq!(output(&c), "Error: request timed out\n");
    }

    #[test]
    fn pending_request_correlation() {
        let mut pending = PendingRequest {
            universe: 1,
            uid: &UID,
            sub_device: 0,
            pid: 0x0082,
            in_flight: Submission::Original,
        };
        assert!(pending.is_answered_by(0x0082));
        assert!(!pending.is_answered_by(0x0060));
        assert!(!pending.is_answered_by(PID_QUEUED_MESSAGE));
        pending.in_flight = Submission::QueuedMessageFetch;
        assert!(pending.is_answered_by(PID_QUEUED_MESSAGE));
        assert!(!pending.is_answered_by(PID_STATUS_MESSAGES));
    }
}
