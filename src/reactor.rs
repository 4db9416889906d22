// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event loop and connection interface.
//!
//! Every response and timer expiry is delivered as an [`Event`] through a
//! single channel, so all protocol progress happens in one place and
//! strictly in sequence.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::frame::{RdmRequest, ResponseStatus};

/// Something the event loop has to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A submitted request completed.
    Response(ResponseStatus),
    /// A timeout registered with [`EventLoop::register_single_timeout`] fired.
    Timeout(TimeoutKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// The device's `ACK_TIMER` elapsed.
    AckTimer,
    /// The caller's deadline for the whole transaction elapsed.
    Abort,
}

/// Single-shot completion callback of a submitted request.
///
/// Dropping it without calling [`Completion::complete`] delivers a
/// transport error, so the event loop never waits for a lost response.
#[derive(Debug)]
pub struct Completion {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl Completion {
    pub fn complete(mut self, status: ResponseStatus) {
        self.deliver(status);
    }

    fn deliver(&mut self, status: ResponseStatus) {
        if let Some(tx) = self.tx.take() {
            // The loop is gone once it terminated, late responses are void.
            if tx.send(Event::Response(status)).is_err() {
                log::debug!("Dropping response, event loop terminated");
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.deliver(ResponseStatus::transport_error("request dropped"));
        }
    }
}

/// Non-blocking submission of requests.
///
/// Implementations call `on_complete` exactly once, either directly or
/// later from another task.
pub trait RdmConnection {
    fn rdm_get(&mut self, request: RdmRequest, on_complete: Completion);

    fn rdm_set(&mut self, request: RdmRequest, on_complete: Completion);
}

/// Run/terminate control for one transaction.
#[derive(Debug)]
pub struct EventLoop {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    timers: Vec<JoinHandle<()>>,
    terminations: usize,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            timers: Vec::new(),
            terminations: 0,
        }
    }

    /// A completion callback that feeds this loop.
    #[must_use]
    pub fn completion(&self) -> Completion {
        Completion {
            tx: Some(self.tx.clone()),
        }
    }

    /// Deliver [`Event::Timeout`] once after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_single_timeout(&mut self, delay: Duration, kind: TimeoutKind) {
        log::debug!("Registering {kind:?} timeout in {delay:?}");
        let tx = self.tx.clone();
        self.timers.retain(|timer| !timer.is_finished());
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::Timeout(kind));
        }));
    }

    /// Wait for the next event, `None` once the loop was terminated.
    pub async fn next_event(&mut self) -> Option<Event> {
        if self.is_terminated() {
            return None;
        }
        // `self.tx` keeps the channel open, `recv` can't return `None` here.
        self.rx.recv().await
    }

    /// Stop the loop, pending timers are cancelled.
    ///
    /// Calling this more than once has no further effect.
    pub fn terminate(&mut self) {
        self.terminations += 1;
        if self.terminations > 1 {
            log::warn!("Event loop terminated {} times", self.terminations);
            return;
        }
        log::debug!("Terminating event loop");
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        self.rx.close();
    }

    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminations > 0
    }

    /// How often [`EventLoop::terminate`] was called.
    #[must_use]
    pub const fn terminations(&self) -> usize {
        self.terminations
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}
