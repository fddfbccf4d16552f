//! Copy and relocate capabilities.
//!
//! With a name list each name is transferred from `from/name` to
//! `to/name`; without one `from` itself becomes `to`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::capabilities::TransferRequest;
use crate::error::CapabilityError;
use crate::event::EventSender;
use crate::plan::{ByteProgress, EntryKind, Plan, percent_of};

const TRANSFER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transfer");

fn pairs(request: &TransferRequest) -> Vec<(PathBuf, PathBuf)> {
    match &request.names {
        Some(names) => names
            .iter()
            .map(|name| (request.from.join(name), request.to.join(name)))
            .collect(),
        None => vec![(request.from.clone(), request.to.clone())],
    }
}

pub(crate) fn copy(
    request: &TransferRequest,
    events: &mut EventSender,
) -> Result<(), CapabilityError> {
    let pairs = pairs(request);
    let mut plans = Vec::with_capacity(pairs.len());
    for (source, target) in pairs {
        let plan = Plan::for_tree(&source, &source)?;
        plans.push((plan, target));
    }
    let total = plans
        .iter()
        .fold(0_u64, |sum, (plan, _)| sum.saturating_add(plan.total_bytes));
    debug!(target: TRANSFER_TARGET, bytes = total, "copying");
    let mut progress = ByteProgress::new(total);
    for (plan, target) in &plans {
        copy_plan(plan, target, &mut progress, &mut |percent| events.progress(percent))?;
    }
    events.progress(progress.percent());
    Ok(())
}

fn copy_plan(
    plan: &Plan,
    target: &Path,
    progress: &mut ByteProgress,
    report: &mut dyn FnMut(u8),
) -> Result<(), CapabilityError> {
    for entry in &plan.entries {
        let destination = entry.target_in(target);
        match entry.kind {
            EntryKind::Directory => fs::create_dir_all(&destination)
                .map_err(|error| CapabilityError::io("create directory", &destination, error))?,
            EntryKind::File => {
                ensure_parent(&destination)?;
                fs::copy(&entry.source, &destination)
                    .map_err(|error| CapabilityError::io("copy file", &entry.source, error))?;
            }
            EntryKind::Symlink => {
                ensure_parent(&destination)?;
                copy_symlink(&entry.source, &destination)?;
            }
        }
        report(progress.advance(entry.len));
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), CapabilityError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|error| CapabilityError::io("create directory", parent, error)),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> Result<(), CapabilityError> {
    let link = fs::read_link(source)
        .map_err(|error| CapabilityError::io("read link", source, error))?;
    std::os::unix::fs::symlink(&link, destination)
        .map_err(|error| CapabilityError::io("create link", destination, error))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> Result<(), CapabilityError> {
    fs::copy(source, destination)
        .map(drop)
        .map_err(|error| CapabilityError::io("copy file", source, error))
}

pub(crate) fn relocate(
    request: &TransferRequest,
    events: &mut EventSender,
) -> Result<(), CapabilityError> {
    let pairs = pairs(request);
    let total = u64::try_from(pairs.len()).unwrap_or(u64::MAX);
    debug!(target: TRANSFER_TARGET, entries = total, "relocating");
    let mut done = 0_u64;
    for (source, target) in &pairs {
        ensure_parent(target)?;
        match fs::rename(source, target) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
                debug!(
                    target: TRANSFER_TARGET,
                    source = %source.display(),
                    "rename crosses devices; copying instead"
                );
                relocate_by_copy(source, target)?;
            }
            Err(error) => return Err(CapabilityError::io("rename", source, error)),
        }
        done = done.saturating_add(1);
        events.progress(percent_of(done, total));
    }
    Ok(())
}

fn relocate_by_copy(source: &Path, target: &Path) -> Result<(), CapabilityError> {
    let plan = Plan::for_tree(source, source)?;
    let mut progress = ByteProgress::new(plan.total_bytes);
    copy_plan(&plan, target, &mut progress, &mut |_| {})?;
    let removed = if plan
        .entries
        .first()
        .is_some_and(|entry| entry.kind == EntryKind::Directory)
    {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    };
    removed.map_err(|error| CapabilityError::io("remove source", source, error))
}
