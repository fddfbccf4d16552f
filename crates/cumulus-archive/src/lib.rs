//! Filesystem capabilities orchestrated by the Cumulus REST layer.
//!
//! Each capability (pack, extract, copy, relocate) runs on its own worker
//! thread and reports through an [`OperationHandle`]: zero or more
//! [`OperationEvent::Progress`] notifications followed by exactly one
//! terminal [`OperationEvent::End`] or [`OperationEvent::Error`]. Callers
//! consume the events in emission order; the crate performs no buffering or
//! reordering of its own.
//!
//! The [`Capabilities`] trait is the seam the daemon depends on.
//! [`FsCapabilities`] is the production implementation; tests build scripted
//! handles with [`OperationHandle::channel`].
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use cumulus_archive::{Capabilities, FsCapabilities, OperationEvent, TransferRequest};
//!
//! let request = TransferRequest::new(
//!     PathBuf::from("/srv/files/docs"),
//!     PathBuf::from("/srv/files/backup"),
//!     Some(vec![String::from("notes.txt")]),
//! );
//! for event in FsCapabilities.copy(request) {
//!     match event {
//!         OperationEvent::Progress(percent) => eprintln!("{percent}%"),
//!         OperationEvent::Error(error) => eprintln!("copy failed: {error}"),
//!         OperationEvent::End => eprintln!("copied"),
//!     }
//! }
//! ```

mod capabilities;
mod error;
mod event;
mod extract;
mod pack;
mod plan;
mod transfer;

pub use self::capabilities::{
    Capabilities, ExtractRequest, FsCapabilities, PackRequest, PackTarget, TransferRequest,
};
pub use self::error::CapabilityError;
pub use self::event::{EventSender, OperationEvent, OperationHandle};
pub use cumulus_config::ArchiveFormat;
