//! Command dispatch for read and write requests.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::thread;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use cumulus_archive::{ArchiveFormat, CapabilityError, PackTarget};

use super::errors::RestError;
use super::message::format_msg;
use super::orchestrator::Job;
use super::paths::ResolvedPath;
use super::request::Command;
use super::{API_DOCUMENT_NAME, API_INFO, ArchiveStream, REST_TARGET, Reply, RestContext};

/// Archive chunks buffered between the packer and the client.
const STREAM_DEPTH: usize = 16;
/// Bytes gathered before a chunk is handed to the client.
const CHUNK_SIZE: usize = 64 * 1024;

pub(super) fn get(context: &RestContext, name: &str) -> Result<Reply, RestError> {
    let Some(command) = name.strip_prefix('/') else {
        return Err(RestError::NotFound);
    };
    if let Some(path) = command.strip_prefix("pack") {
        return stream_pack(context, path);
    }
    if command.is_empty() {
        let body = json!({ "info": API_INFO }).to_string();
        return Ok(Reply::Document {
            name: API_DOCUMENT_NAME,
            body,
        });
    }
    Err(RestError::NotFound)
}

pub(super) fn put(
    context: &RestContext,
    name: &str,
    body: Option<&[u8]>,
) -> Result<Reply, RestError> {
    let raw = std::str::from_utf8(body.unwrap_or_default())
        .map_err(|error| RestError::read_body(error.to_string()))?;
    let command_name = name.strip_prefix('/').unwrap_or(name);
    let command = Command::parse(command_name, raw)?;
    debug!(target: REST_TARGET, command = command.name(), "dispatching command");

    match command {
        Command::Move {
            from,
            to,
            names,
            payload,
        } => relocate(context, &from, &to, names, &payload),
        Command::Copy { from, to, names } => copy(context, &from, &to, &names),
        Command::Pack { from, to, names } => pack(context, &from, to.as_deref(), names),
        Command::Extract { from, to } => extract(context, &from, to.as_deref()),
        Command::Unknown(_) => Ok(Reply::Empty),
    }
}

/// Resolves `from` and `to` for a move or copy, refusing root operands.
fn resolve_guarded(
    context: &RestContext,
    from: &str,
    to: &str,
) -> Result<(ResolvedPath, ResolvedPath), RestError> {
    let guard = context.guard();
    if guard.is_triggered(&[to, from]) {
        return Err(RestError::RootGuard);
    }
    let resolver = context.resolver();
    let from = resolver.resolve(from)?;
    let to = resolver.resolve(to)?;
    if guard.covers(&[&to, &from]) {
        return Err(RestError::RootGuard);
    }
    Ok((from, to))
}

fn relocate(
    context: &RestContext,
    from: &str,
    to: &str,
    names: Option<Vec<String>>,
    payload: &Value,
) -> Result<Reply, RestError> {
    let (from, to) = resolve_guarded(context, from, to)?;
    let resolver = context.resolver();
    let names = names
        .map(|names| resolver.resolve_names(&names))
        .transpose()?;
    let job = Job::relocate(from.into_path_buf(), to.into_path_buf(), names)
        .with_reply(format_msg("move", payload, None));
    run(context, job)
}

fn copy(
    context: &RestContext,
    from: &str,
    to: &str,
    names: &[String],
) -> Result<Reply, RestError> {
    let (from, to) = resolve_guarded(context, from, to)?;
    let names = context.resolver().resolve_names(names)?;
    let reply = format_msg("copy", &Value::from(names.clone()), None);
    let job = Job::copy(from.into_path_buf(), to.into_path_buf(), names).with_reply(reply);
    run(context, job)
}

fn pack(
    context: &RestContext,
    from: &str,
    to: Option<&str>,
    names: Option<Vec<String>>,
) -> Result<Reply, RestError> {
    let resolver = context.resolver();
    let source = resolver.resolve(from)?;
    let archive = match to {
        Some(to) => resolver.resolve(to)?,
        None => source.with_suffix(context.orchestrator().packer().extension())?,
    };
    let (source_dir, names) = match names {
        Some(names) => (source, resolver.resolve_names(&names)?),
        None => {
            let (parent, leaf) = source.split_leaf()?;
            (parent, vec![leaf])
        }
    };
    let job = Job::pack(
        source_dir.into_path_buf(),
        Some(names),
        PackTarget::File(archive.into_path_buf()),
    );
    run(context, job)
}

fn extract(context: &RestContext, from: &str, to: Option<&str>) -> Result<Reply, RestError> {
    let resolver = context.resolver();
    let archive = resolver.resolve(from)?;
    let destination = match to {
        Some(to) => resolver.resolve(to)?,
        None => {
            let format = ArchiveFormat::detect(&archive.file_name());
            archive.without_suffix(format.extension())
        }
    };
    let job = Job::extract(archive.into_path_buf(), destination.into_path_buf());
    run(context, job)
}

fn run(context: &RestContext, job: Job) -> Result<Reply, RestError> {
    context
        .orchestrator()
        .run_to_completion(job)
        .map(Reply::Envelope)
        .map_err(RestError::from)
}

fn stream_pack(context: &RestContext, path: &str) -> Result<Reply, RestError> {
    let format = context.orchestrator().packer();
    let target = context.resolver().resolve(format.strip_extension(path))?;
    let (source_dir, leaf) = target.split_leaf()?;
    let source = source_dir.as_path().join(&leaf);
    if let Err(error) = fs::symlink_metadata(&source) {
        debug!(
            target: REST_TARGET,
            source = %source.display(),
            %error,
            "pack source unavailable"
        );
        return Err(RestError::NotFound);
    }

    let (sender, chunks) = mpsc::channel(STREAM_DEPTH);
    let sink = BufWriter::with_capacity(CHUNK_SIZE, ChunkWriter { sender });
    let job = Job::pack(
        source_dir.into_path_buf(),
        Some(vec![leaf.clone()]),
        PackTarget::Stream(Box::new(sink)),
    );
    let orchestrator = context.orchestrator().clone();
    thread::Builder::new()
        .name(String::from("cumulus-pack-stream"))
        .spawn(move || {
            orchestrator.run(job, |outcome| {
                if let Err(error) = outcome {
                    warn!(
                        target: REST_TARGET,
                        %error,
                        "archive stream ended early"
                    );
                }
            });
        })
        .map_err(|error| RestError::from(CapabilityError::spawn("pack", error)))?;

    Ok(Reply::Archive(ArchiveStream {
        file_name: format!("{leaf}{}", format.extension()),
        format,
        chunks,
    }))
}

/// Forwards written bytes to the response body channel.
///
/// Writes block while the channel is full, so a slow client slows the
/// packer down. A closed channel surfaces as [`io::ErrorKind::BrokenPipe`].
struct ChunkWriter {
    sender: mpsc::Sender<Vec<u8>>,
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sender
            .blocking_send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive stream closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
