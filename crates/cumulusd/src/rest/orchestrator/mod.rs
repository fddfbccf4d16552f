//! Adapts event-driven capabilities into a single completion.
//!
//! The orchestrator starts a capability, forwards every progress event to a
//! [`ProgressSink`] and turns the first terminal event into exactly one call
//! of the completion callback. Events after a terminal one are never read.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use cumulus_archive::{
    ArchiveFormat, Capabilities, CapabilityError, ExtractRequest, OperationEvent, OperationHandle,
    PackRequest, PackTarget, TransferRequest,
};

use super::message::{Envelope, format_msg};

const ORCHESTRATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::orchestrator");
const PROGRESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::progress");

/// Kind of long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Archive creation.
    Pack,
    /// Archive extraction.
    Extract,
    /// Recursive copy.
    Copy,
    /// Move or rename.
    Move,
}

impl OperationKind {
    /// Label used in reply envelopes and progress logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pack => "pack",
            Self::Extract => "extract",
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Work {
    Pack { target: PackTarget },
    Extract { to: PathBuf },
    Copy { to: PathBuf },
    Move { to: PathBuf },
}

/// One operation to run.
#[derive(Debug)]
pub struct Job {
    from: PathBuf,
    names: Option<Vec<String>>,
    work: Work,
    reply: Option<Envelope>,
}

impl Job {
    /// Archive `names` found in `from` (default: the entry named like
    /// `from`) into `target`.
    #[must_use]
    pub fn pack(from: PathBuf, names: Option<Vec<String>>, target: PackTarget) -> Self {
        Self::new(from, names, Work::Pack { target })
    }

    /// Unpack the archive at `from` into `to`.
    #[must_use]
    pub fn extract(from: PathBuf, to: PathBuf) -> Self {
        Self::new(from, None, Work::Extract { to })
    }

    /// Copy `names` from `from` into `to`.
    #[must_use]
    pub fn copy(from: PathBuf, to: PathBuf, names: Vec<String>) -> Self {
        Self::new(from, Some(names), Work::Copy { to })
    }

    /// Move `names` from `from` into `to`, or `from` itself to `to` when no
    /// names are given.
    #[must_use]
    pub fn relocate(from: PathBuf, to: PathBuf, names: Option<Vec<String>>) -> Self {
        Self::new(from, names, Work::Move { to })
    }

    const fn new(from: PathBuf, names: Option<Vec<String>>, work: Work) -> Self {
        Self {
            from,
            names,
            work,
            reply: None,
        }
    }

    /// Replaces the success envelope.
    #[must_use]
    pub fn with_reply(mut self, reply: Envelope) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self.work {
            Work::Pack { .. } => OperationKind::Pack,
            Work::Extract { .. } => OperationKind::Extract,
            Work::Copy { .. } => OperationKind::Copy,
            Work::Move { .. } => OperationKind::Move,
        }
    }

    /// Source path.
    #[must_use]
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Entry names, defaulting to the final component of `from`.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.names
            .clone()
            .unwrap_or_else(|| vec![base_name(&self.from)])
    }

    fn default_reply(&self) -> Envelope {
        format_msg(
            self.kind().as_str(),
            &Value::String(base_name(&self.from)),
            None,
        )
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Receives progress notifications from running operations.
pub trait ProgressSink: Send + Sync {
    /// Called for every progress event, in emission order.
    fn progress(&self, kind: OperationKind, label: &str, percent: u8);
}

/// Sink that writes progress to the operational log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn progress(&self, kind: OperationKind, label: &str, percent: u8) {
        info!(
            target: PROGRESS_TARGET,
            operation = kind.as_str(),
            entry = label,
            percent,
            "{kind} \"{label}\": {percent}%"
        );
    }
}

/// Holds the completion callback until the first terminal outcome.
struct Completion<F> {
    callback: Option<F>,
}

impl<F> Completion<F>
where
    F: FnOnce(Result<Envelope, CapabilityError>),
{
    const fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn complete(&mut self, outcome: Result<Envelope, CapabilityError>) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }
}

/// Runs jobs against a set of capabilities.
#[derive(Clone)]
pub struct Orchestrator {
    capabilities: Arc<dyn Capabilities>,
    progress: Arc<dyn ProgressSink>,
    packer: ArchiveFormat,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("packer", &self.packer)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator packing with `packer`.
    #[must_use]
    pub fn new(
        capabilities: Arc<dyn Capabilities>,
        progress: Arc<dyn ProgressSink>,
        packer: ArchiveFormat,
    ) -> Self {
        Self {
            capabilities,
            progress,
            packer,
        }
    }

    /// Archive format used by pack jobs.
    #[must_use]
    pub const fn packer(&self) -> ArchiveFormat {
        self.packer
    }

    /// Runs `job`, blocking until it terminates, and calls `on_complete`
    /// exactly once with the outcome.
    ///
    /// A stream that closes without a terminal event completes with
    /// [`CapabilityError::Disconnected`].
    pub fn run<F>(&self, job: Job, on_complete: F)
    where
        F: FnOnce(Result<Envelope, CapabilityError>),
    {
        let mut completion = Completion::new(on_complete);
        let kind = job.kind();
        let names = job.names();
        let label = names.first().cloned().unwrap_or_default();
        let reply = job.reply.clone().unwrap_or_else(|| job.default_reply());
        debug!(
            target: ORCHESTRATOR_TARGET,
            operation = kind.as_str(),
            from = %job.from.display(),
            ?names,
            "starting operation"
        );

        for event in self.start(job, names) {
            let terminal = event.is_terminal();
            match event {
                OperationEvent::Progress(percent) => {
                    self.progress.progress(kind, &label, percent);
                }
                OperationEvent::Error(error) => {
                    debug!(
                        target: ORCHESTRATOR_TARGET,
                        operation = kind.as_str(),
                        %error,
                        "operation failed"
                    );
                    completion.complete(Err(error));
                }
                OperationEvent::End => {
                    debug!(
                        target: ORCHESTRATOR_TARGET,
                        operation = kind.as_str(),
                        "operation finished"
                    );
                    completion.complete(Ok(reply.clone()));
                }
            }
            if terminal {
                return;
            }
        }
        completion.complete(Err(CapabilityError::Disconnected));
    }

    /// Runs `job` and returns its outcome.
    pub fn run_to_completion(&self, job: Job) -> Result<Envelope, CapabilityError> {
        let mut outcome = None;
        self.run(job, |result| outcome = Some(result));
        outcome.unwrap_or(Err(CapabilityError::Disconnected))
    }

    fn start(&self, job: Job, names: Vec<String>) -> OperationHandle {
        let Job {
            from,
            names: explicit,
            work,
            ..
        } = job;
        match work {
            Work::Pack { target } => self.capabilities.pack(
                self.packer,
                PackRequest {
                    source_dir: from,
                    names,
                    target,
                },
            ),
            Work::Extract { to } => self.capabilities.extract(ExtractRequest {
                archive: from,
                destination: to,
            }),
            Work::Copy { to } => self
                .capabilities
                .copy(TransferRequest::new(from, to, Some(names))),
            Work::Move { to } => self
                .capabilities
                .relocate(TransferRequest::new(from, to, explicit)),
        }
    }
}
