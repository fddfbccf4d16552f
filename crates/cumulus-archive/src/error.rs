//! Errors reported by capability workers.
//!
//! I/O and zip errors are wrapped in `Arc` to satisfy the `result_large_err`
//! Clippy lint.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Failure reported through [`crate::OperationEvent::Error`].
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// A filesystem call failed.
    #[error("{operation} failed for '{}': {source}", path.display())]
    Io {
        /// Short description of the failed call.
        operation: &'static str,
        /// Path the call was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Directory traversal failed while planning an operation.
    #[error("failed to walk '{}': {message}", path.display())]
    Walk {
        /// Path being walked.
        path: PathBuf,
        /// Description of the traversal failure.
        message: String,
    },

    /// The zip container could not be read or written.
    #[error("zip archive error: {source}")]
    Zip {
        /// Underlying zip error.
        #[source]
        source: Arc<zip::result::ZipError>,
    },

    /// An archive entry would be written outside the destination directory.
    #[error("archive entry '{name}' escapes the destination directory")]
    UnsafeEntry {
        /// Entry name as stored in the archive.
        name: String,
    },

    /// The worker thread could not be started.
    #[error("failed to start {operation} worker: {source}")]
    Spawn {
        /// Operation the worker was meant to run.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The worker stopped without reporting a terminal event.
    #[error("operation worker stopped without reporting completion")]
    Disconnected,
}

impl CapabilityError {
    /// Creates an I/O error for `path`.
    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    /// Creates a traversal error.
    pub fn walk(path: &Path, message: impl Into<String>) -> Self {
        Self::Walk {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Wraps a zip container error.
    #[must_use]
    pub fn zip(source: zip::result::ZipError) -> Self {
        Self::Zip {
            source: Arc::new(source),
        }
    }

    /// Creates an unsafe entry error.
    pub fn unsafe_entry(name: impl Into<String>) -> Self {
        Self::UnsafeEntry { name: name.into() }
    }

    /// Creates a worker spawn error.
    #[must_use]
    pub fn spawn(operation: &'static str, source: io::Error) -> Self {
        Self::Spawn {
            operation,
            source: Arc::new(source),
        }
    }
}
