//! Event stream shared by every capability.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::error::CapabilityError;

const EVENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::event");

/// Notification emitted by a running capability.
#[derive(Debug)]
pub enum OperationEvent {
    /// Completion percentage, never lower than the previous notification.
    Progress(u8),
    /// Terminal failure. No further events follow.
    Error(CapabilityError),
    /// Terminal success. No further events follow.
    End,
}

impl OperationEvent {
    /// Whether this event ends the operation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::End)
    }
}

/// Producer half of an operation's event stream.
///
/// Progress notifications are clamped to 100 and de-duplicated so consumers
/// observe a strictly increasing sequence. The terminal methods consume the
/// sender, so a worker cannot report completion twice.
#[derive(Debug)]
pub struct EventSender {
    sender: Sender<OperationEvent>,
    last_percent: Option<u8>,
}

impl EventSender {
    /// Reports progress as a completion percentage.
    pub fn progress(&mut self, percent: u8) {
        let clamped = percent.min(100);
        if self.last_percent.is_some_and(|last| clamped <= last) {
            return;
        }
        self.last_percent = Some(clamped);
        self.send(OperationEvent::Progress(clamped));
    }

    /// Reports successful completion.
    pub fn finish(self) {
        self.send(OperationEvent::End);
    }

    /// Reports failure.
    pub fn fail(self, error: CapabilityError) {
        self.send(OperationEvent::Error(error));
    }

    /// Sends a raw event without progress bookkeeping.
    ///
    /// Intended for scripted streams in tests and adapters that replay
    /// events produced elsewhere.
    pub fn emit(&self, event: OperationEvent) {
        self.send(event);
    }

    fn send(&self, event: OperationEvent) {
        if self.sender.send(event).is_err() {
            debug!(target: EVENT_TARGET, "operation consumer went away");
        }
    }
}

/// Consumer half of an operation's event stream.
///
/// Iterating blocks until the next event arrives and stops once the worker
/// drops its sender.
#[derive(Debug)]
pub struct OperationHandle {
    receiver: Receiver<OperationEvent>,
}

impl OperationHandle {
    /// Creates a connected sender/handle pair.
    #[must_use]
    pub fn channel() -> (EventSender, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            EventSender {
                sender,
                last_percent: None,
            },
            Self { receiver },
        )
    }

    /// Runs `job` on a named worker thread.
    ///
    /// The job reports progress through the supplied sender; its result is
    /// turned into the single terminal event. If the thread cannot be
    /// started the handle yields an immediate [`CapabilityError::Spawn`].
    pub fn spawn<F>(operation: &'static str, job: F) -> Self
    where
        F: FnOnce(&mut EventSender) -> Result<(), CapabilityError> + Send + 'static,
    {
        let (mut sender, handle) = Self::channel();
        let (spawn_failed, spawn_handle) = Self::channel();
        let spawned = thread::Builder::new()
            .name(format!("cumulus-{operation}"))
            .spawn(move || match job(&mut sender) {
                Ok(()) => sender.finish(),
                Err(error) => sender.fail(error),
            });
        match spawned {
            Ok(_) => handle,
            Err(source) => {
                spawn_failed.fail(CapabilityError::spawn(operation, source));
                spawn_handle
            }
        }
    }

    /// Blocks until the next event; `None` once the stream is closed.
    #[must_use]
    pub fn next_event(&self) -> Option<OperationEvent> {
        self.receiver.recv().ok()
    }
}

impl Iterator for OperationHandle {
    type Item = OperationEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
