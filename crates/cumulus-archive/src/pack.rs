//! Archive writers for the pack capability.
//!
//! Both containers read the planned entries in order and report progress as
//! the fraction of file bytes written so far.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::ArchiveFormat;
use crate::capabilities::{PackRequest, PackTarget};
use crate::error::CapabilityError;
use crate::event::EventSender;
use crate::plan::{ByteProgress, EntryKind, Plan, PlannedEntry};

const PACK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pack");

pub(crate) fn run(
    format: ArchiveFormat,
    request: PackRequest,
    events: &mut EventSender,
) -> Result<(), CapabilityError> {
    let PackRequest {
        source_dir,
        names,
        target,
    } = request;
    let plan = Plan::for_names(&source_dir, &names)?;
    debug!(
        target: PACK_TARGET,
        source = %source_dir.display(),
        entries = plan.entries.len(),
        bytes = plan.total_bytes,
        ?format,
        "packing"
    );
    match (format, target) {
        (ArchiveFormat::Tar, PackTarget::File(path)) => {
            let file = create_file(&path)?;
            write_tar(file, &plan, events)
                .map(drop)
                .inspect_err(|_| discard_partial(&path))?;
        }
        (ArchiveFormat::Tar, PackTarget::Stream(writer)) => {
            write_tar(writer, &plan, events)?;
        }
        (ArchiveFormat::Zip, PackTarget::File(path)) => {
            let file = create_file(&path)?;
            write_zip(file, &plan, events)
                .map(drop)
                .inspect_err(|_| discard_partial(&path))?;
        }
        (ArchiveFormat::Zip, PackTarget::Stream(mut writer)) => {
            // The zip central directory needs a seekable sink.
            let mut spool =
                tempfile::tempfile().map_err(|error| spool_error("create spool", error))?;
            write_zip(&mut spool, &plan, events)?;
            spool
                .seek(SeekFrom::Start(0))
                .map_err(|error| spool_error("rewind spool", error))?;
            io::copy(&mut spool, &mut writer)
                .map_err(|error| spool_error("stream archive", error))?;
            writer
                .flush()
                .map_err(|error| spool_error("flush archive", error))?;
        }
    }
    Ok(())
}

fn create_file(path: &Path) -> Result<File, CapabilityError> {
    File::create(path).map_err(|error| CapabilityError::io("create archive", path, error))
}

fn spool_error(operation: &'static str, error: io::Error) -> CapabilityError {
    CapabilityError::io(operation, Path::new("<stream>"), error)
}

fn write_tar<W: Write>(
    sink: W,
    plan: &Plan,
    events: &mut EventSender,
) -> Result<W, CapabilityError> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    let mut progress = ByteProgress::new(plan.total_bytes);
    for entry in &plan.entries {
        let name = entry.archive_name();
        if name.is_empty() {
            continue;
        }
        builder
            .append_path_with_name(&entry.source, &name)
            .map_err(|error| CapabilityError::io("append entry", &entry.source, error))?;
        events.progress(progress.advance(entry.len));
    }
    let encoder = builder
        .into_inner()
        .map_err(|error| spool_error("finish tar", error))?;
    let mut sink = encoder
        .finish()
        .map_err(|error| spool_error("finish gzip", error))?;
    sink.flush()
        .map_err(|error| spool_error("flush archive", error))?;
    events.progress(progress.percent());
    Ok(sink)
}

fn write_zip<W: Write + Seek>(
    sink: W,
    plan: &Plan,
    events: &mut EventSender,
) -> Result<W, CapabilityError> {
    let mut writer = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut progress = ByteProgress::new(plan.total_bytes);
    for entry in &plan.entries {
        let name = entry.archive_name();
        if name.is_empty() {
            continue;
        }
        match entry.kind {
            EntryKind::Directory => writer
                .add_directory(name.as_str(), options)
                .map_err(CapabilityError::zip)?,
            EntryKind::File => append_zip_file(&mut writer, entry, &name, options)?,
            EntryKind::Symlink => {
                warn!(
                    target: PACK_TARGET,
                    entry = %name,
                    "skipping symbolic link in zip archive"
                );
            }
        }
        events.progress(progress.advance(entry.len));
    }
    let sink = writer.finish().map_err(CapabilityError::zip)?;
    events.progress(progress.percent());
    Ok(sink)
}

fn append_zip_file<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    entry: &PlannedEntry,
    name: &str,
    options: SimpleFileOptions,
) -> Result<(), CapabilityError> {
    writer
        .start_file(name, options)
        .map_err(CapabilityError::zip)?;
    let mut source = File::open(&entry.source)
        .map_err(|error| CapabilityError::io("open entry", &entry.source, error))?;
    io::copy(&mut source, writer)
        .map_err(|error| CapabilityError::io("write entry", &entry.source, error))?;
    Ok(())
}

fn discard_partial(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        debug!(
            target: PACK_TARGET,
            path = %path.display(),
            %error,
            "could not remove partial archive"
        );
    }
}
