//! Archive readers for the extract capability.
//!
//! Entries whose names would land outside the destination directory abort
//! the extraction with [`CapabilityError::UnsafeEntry`].

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;

use flate2::read::GzDecoder;
use tracing::debug;
use zip::ZipArchive;

use crate::ArchiveFormat;
use crate::capabilities::ExtractRequest;
use crate::error::CapabilityError;
use crate::event::EventSender;
use crate::plan::percent_of;

const EXTRACT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::extract");

pub(crate) fn run(request: ExtractRequest, events: &mut EventSender) -> Result<(), CapabilityError> {
    let ExtractRequest {
        archive,
        destination,
    } = request;
    let file_name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ArchiveFormat::detect(&file_name);
    debug!(
        target: EXTRACT_TARGET,
        archive = %archive.display(),
        destination = %destination.display(),
        ?format,
        "extracting"
    );
    match format {
        ArchiveFormat::Tar => extract_tar(&archive, &destination, events),
        ArchiveFormat::Zip => extract_zip(&archive, &destination, events),
    }
}

/// Counts bytes pulled from the compressed archive.
struct CountingReader<R> {
    inner: R,
    read: Rc<Cell<u64>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        let count_u64 = u64::try_from(count).unwrap_or(u64::MAX);
        self.read.set(self.read.get().saturating_add(count_u64));
        Ok(count)
    }
}

fn extract_tar(
    archive: &Path,
    destination: &Path,
    events: &mut EventSender,
) -> Result<(), CapabilityError> {
    let file =
        File::open(archive).map_err(|error| CapabilityError::io("open archive", archive, error))?;
    let total = file
        .metadata()
        .map_err(|error| CapabilityError::io("stat archive", archive, error))?
        .len();
    create_destination(destination)?;
    let read = Rc::new(Cell::new(0_u64));
    let reader = CountingReader {
        inner: file,
        read: Rc::clone(&read),
    };
    let mut tarball = tar::Archive::new(GzDecoder::new(reader));
    let entries = tarball
        .entries()
        .map_err(|error| CapabilityError::io("read archive", archive, error))?;
    for item in entries {
        let mut entry = item.map_err(|error| CapabilityError::io("read entry", archive, error))?;
        let name = entry
            .path()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unpacked = entry
            .unpack_in(destination)
            .map_err(|error| CapabilityError::io("unpack entry", destination, error))?;
        if !unpacked {
            return Err(CapabilityError::unsafe_entry(name));
        }
        events.progress(percent_of(read.get(), total));
    }
    events.progress(100);
    Ok(())
}

fn extract_zip(
    archive: &Path,
    destination: &Path,
    events: &mut EventSender,
) -> Result<(), CapabilityError> {
    let file =
        File::open(archive).map_err(|error| CapabilityError::io("open archive", archive, error))?;
    let mut zip = ZipArchive::new(file).map_err(CapabilityError::zip)?;
    create_destination(destination)?;
    let count = zip.len();
    let total = u64::try_from(count).unwrap_or(u64::MAX);
    for index in 0..count {
        let mut entry = zip.by_index(index).map_err(CapabilityError::zip)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(CapabilityError::unsafe_entry(entry.name()));
        };
        let target = destination.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|error| CapabilityError::io("create directory", &target, error))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|error| CapabilityError::io("create directory", parent, error))?;
            }
            let mut output = File::create(&target)
                .map_err(|error| CapabilityError::io("create file", &target, error))?;
            io::copy(&mut entry, &mut output)
                .map_err(|error| CapabilityError::io("write file", &target, error))?;
            apply_mode(&target, entry.unix_mode())?;
        }
        let done = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1);
        events.progress(percent_of(done, total));
    }
    events.progress(100);
    Ok(())
}

fn create_destination(destination: &Path) -> Result<(), CapabilityError> {
    fs::create_dir_all(destination)
        .map_err(|error| CapabilityError::io("create destination", destination, error))
}

#[cfg(unix)]
fn apply_mode(target: &Path, mode: Option<u32>) -> Result<(), CapabilityError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(bits) = mode else {
        return Ok(());
    };
    fs::set_permissions(target, fs::Permissions::from_mode(bits & 0o777))
        .map_err(|error| CapabilityError::io("set permissions", target, error))
}

#[cfg(not(unix))]
fn apply_mode(_target: &Path, _mode: Option<u32>) -> Result<(), CapabilityError> {
    Ok(())
}
