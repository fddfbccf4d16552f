//! The capability seam and its filesystem implementation.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use crate::ArchiveFormat;
use crate::event::OperationHandle;
use crate::{extract, pack, transfer};

/// Where a pack operation writes its archive.
pub enum PackTarget {
    /// Create (or truncate) an archive file at this path.
    File(PathBuf),
    /// Write the archive bytes to a caller-supplied sink.
    Stream(Box<dyn Write + Send>),
}

impl fmt::Debug for PackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Archive `names` found in `source_dir`.
#[derive(Debug)]
pub struct PackRequest {
    /// Directory containing the entries to archive.
    pub source_dir: PathBuf,
    /// Entry names relative to `source_dir`; stored under the same names.
    pub names: Vec<String>,
    /// Destination for the archive bytes.
    pub target: PackTarget,
}

/// Unpack `archive` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Archive file; `.zip` names are read as zip, anything else as tar.gz.
    pub archive: PathBuf,
    /// Directory receiving the extracted entries. Created when missing.
    pub destination: PathBuf,
}

/// Copy or relocate entries between directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source directory, or the source entry itself when `names` is absent.
    pub from: PathBuf,
    /// Destination directory, or the destination entry itself when `names`
    /// is absent.
    pub to: PathBuf,
    /// Entries to transfer from `from` into `to`.
    pub names: Option<Vec<String>>,
}

impl TransferRequest {
    /// Builds a transfer request.
    #[must_use]
    pub const fn new(from: PathBuf, to: PathBuf, names: Option<Vec<String>>) -> Self {
        Self { from, to, names }
    }
}

/// Asynchronous filesystem operations reported through event streams.
///
/// Every method returns immediately; the work proceeds in the background and
/// the returned handle yields progress followed by one terminal event.
pub trait Capabilities: Send + Sync {
    /// Archives entries using the given container format.
    fn pack(&self, format: ArchiveFormat, request: PackRequest) -> OperationHandle;

    /// Unpacks an archive.
    fn extract(&self, request: ExtractRequest) -> OperationHandle;

    /// Copies entries, recursing into directories.
    fn copy(&self, request: TransferRequest) -> OperationHandle;

    /// Moves entries, falling back to copy-and-delete across filesystems.
    fn relocate(&self, request: TransferRequest) -> OperationHandle;
}

/// [`Capabilities`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCapabilities;

impl Capabilities for FsCapabilities {
    fn pack(&self, format: ArchiveFormat, request: PackRequest) -> OperationHandle {
        OperationHandle::spawn("pack", move |events| pack::run(format, request, events))
    }

    fn extract(&self, request: ExtractRequest) -> OperationHandle {
        OperationHandle::spawn("extract", move |events| extract::run(request, events))
    }

    fn copy(&self, request: TransferRequest) -> OperationHandle {
        OperationHandle::spawn("copy", move |events| transfer::copy(&request, events))
    }

    fn relocate(&self, request: TransferRequest) -> OperationHandle {
        OperationHandle::spawn("move", move |events| transfer::relocate(&request, events))
    }
}
