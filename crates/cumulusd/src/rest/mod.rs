//! REST command layer.
//!
//! [`Router`] decides whether a request belongs to the API; the dispatcher
//! parses the command, resolves operands beneath the root and runs the
//! operation through the [`Orchestrator`]. Everything here is synchronous and
//! transport-agnostic: the HTTP adapter in [`crate::http`] runs it on a
//! blocking task and maps [`Reply`] values onto responses.

mod dispatch;
pub mod errors;
pub mod message;
pub mod orchestrator;
pub mod paths;
pub mod request;
mod router;

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use tokio::sync::mpsc;

use cumulus_archive::{ArchiveFormat, Capabilities};
use cumulus_config::Config;

pub use self::errors::RestError;
pub use self::message::{Envelope, format_msg};
pub use self::orchestrator::{
    Job, OperationKind, Orchestrator, ProgressSink, TracingProgressSink,
};
pub use self::paths::{PathResolver, Platform, ResolvedPath, RootGuard};
pub use self::router::Router;

/// Tracing target for the REST layer.
pub(crate) const REST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::rest");

/// Name of the informational document served at the API root.
pub const API_DOCUMENT_NAME: &str = "api.json";

/// Text of the informational document's `info` field.
pub const API_INFO: &str = "Cloud Commander API v1";

/// Transport-neutral view of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    method: Method,
    path: String,
    body: Option<Vec<u8>>,
}

impl RestRequest {
    /// Request without a body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attaches a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, possibly including a query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw body bytes, when present.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Archive bytes streamed to the client as they are produced.
pub struct ArchiveStream {
    /// Suggested download name, including the archive extension.
    pub file_name: String,
    /// Container format of the bytes.
    pub format: ArchiveFormat,
    /// Chunks in order; the channel closes when packing stops.
    pub chunks: mpsc::Receiver<Vec<u8>>,
}

impl fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Successful outcome of an API request.
#[derive(Debug)]
pub enum Reply {
    /// JSON envelope.
    Envelope(Envelope),
    /// Named document; the name determines the content type.
    Document {
        /// Document name, such as `api.json`.
        name: &'static str,
        /// Serialised document body.
        body: String,
    },
    /// Streamed archive.
    Archive(ArchiveStream),
    /// Success with no body.
    Empty,
}

/// Router decision for a request.
#[derive(Debug)]
pub enum Routing {
    /// Not an API request; the surrounding pipeline should continue.
    Next,
    /// The API handled the request.
    Handled(Result<Reply, RestError>),
}

/// Collaborators shared by every API request.
#[derive(Debug, Clone)]
pub struct RestContext {
    prefix: String,
    resolver: PathResolver,
    guard: RootGuard,
    orchestrator: Orchestrator,
}

impl RestContext {
    /// Builds a context from configuration for the host platform, logging
    /// progress through `tracing`.
    #[must_use]
    pub fn from_config(config: &Config, capabilities: Arc<dyn Capabilities>) -> Self {
        Self::new(
            config,
            capabilities,
            Arc::new(TracingProgressSink),
            Platform::host(),
        )
    }

    /// Builds a context with explicit collaborators.
    #[must_use]
    pub fn new(
        config: &Config,
        capabilities: Arc<dyn Capabilities>,
        progress: Arc<dyn ProgressSink>,
        platform: Platform,
    ) -> Self {
        Self {
            prefix: config.prefix().to_owned(),
            resolver: PathResolver::new(config.root().as_std_path()),
            guard: RootGuard::new(config.root_is_marker(), platform),
            orchestrator: Orchestrator::new(capabilities, progress, config.packer()),
        }
    }

    /// API prefix without a trailing separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path resolver for the configured root.
    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Root guard for the configured root and platform.
    #[must_use]
    pub const fn guard(&self) -> &RootGuard {
        &self.guard
    }

    /// Operation orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}
