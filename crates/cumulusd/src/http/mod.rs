//! HTTP adapter for the REST layer.
//!
//! [`api_layer`] is an axum middleware: API requests are answered here, all
//! other requests continue down the stack untouched. Request paths are
//! percent-decoded before routing. Dispatch is synchronous, so it runs on
//! tokio's blocking pool.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router as AxumRouter};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use cumulus_archive::FsCapabilities;
use cumulus_config::ListenEndpoint;

use crate::bootstrap::Daemon;
use crate::health::HealthReporter;
use crate::rest::{
    ArchiveStream, Envelope, Reply, RestContext, RestError, RestRequest, Router, Routing,
};

const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Largest request body accepted by the API.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Errors raised while serving HTTP.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listener could not be bound.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        /// Endpoint that was requested.
        endpoint: ListenEndpoint,
        /// Error reported by the listener.
        #[source]
        source: Arc<io::Error>,
    },
    /// The server stopped with an I/O error.
    #[error("server error: {source}")]
    Serve {
        /// Error reported by the server loop.
        #[source]
        source: Arc<io::Error>,
    },
}

impl ServeError {
    fn bind(endpoint: &ListenEndpoint, source: io::Error) -> Self {
        Self::Bind {
            endpoint: endpoint.clone(),
            source: Arc::new(source),
        }
    }

    fn serve(source: io::Error) -> Self {
        Self::Serve {
            source: Arc::new(source),
        }
    }
}

/// Middleware that answers API requests and defers everything else.
pub async fn api_layer(
    State(router): State<Arc<Router>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let raw_path = request.uri().path().to_owned();
    let path = match percent_decode_str(&raw_path).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) if router.command_name(&method, &raw_path).is_none() => {
            return next.run(request).await;
        }
        Err(_) => {
            return RestError::invalid_operand(raw_path, "request path is not valid UTF-8")
                .into_response();
        }
    };
    if router.command_name(&method, &path).is_none() {
        return next.run(request).await;
    }

    let body = match to_bytes(request.into_body(), BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(error) => return RestError::read_body(error.to_string()).into_response(),
    };
    let rest_request = RestRequest::new(method, path).with_body(body.to_vec());
    let routed = tokio::task::spawn_blocking(move || router.route(&rest_request)).await;

    match routed {
        Ok(Routing::Handled(Ok(reply))) => reply.into_response(),
        Ok(Routing::Handled(Err(rest_error))) => rest_error.into_response(),
        Ok(Routing::Next) => {
            warn!(target: HTTP_TARGET, "router declined a request it had claimed");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(join_error) => {
            error!(target: HTTP_TARGET, error = %join_error, "dispatch task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::error("internal error", 500)),
            )
                .into_response()
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Envelope(envelope) => Json(envelope).into_response(),
            Self::Document { name, body } => {
                ([(header::CONTENT_TYPE, content_type_for(name))], body).into_response()
            }
            Self::Archive(stream) => archive_response(stream),
            Self::Empty => StatusCode::OK.into_response(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        match self.to_envelope() {
            Some(envelope) => (status, Json(envelope)).into_response(),
            None => (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                self.to_string(),
            )
                .into_response(),
        }
    }
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn archive_response(stream: ArchiveStream) -> Response {
    let ArchiveStream {
        file_name,
        format,
        chunks,
    } = stream;
    let body = Body::from_stream(ReceiverStream::new(chunks).map(Ok::<_, Infallible>));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Builds the HTTP application around `router`.
///
/// Requests that are not for the API fall through to a plain 404.
pub fn app(router: Router) -> AxumRouter {
    AxumRouter::new()
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(Arc::new(router), api_layer))
        .layer(TraceLayer::new_for_http())
}

/// Serves the API for `daemon` until Ctrl-C.
pub async fn serve(daemon: Daemon) -> Result<(), ServeError> {
    let config = daemon.config();
    let reporter = daemon.reporter();
    let context = RestContext::from_config(config, Arc::new(FsCapabilities));
    let app = app(Router::new(context));
    let endpoint = config.listen();

    match endpoint {
        ListenEndpoint::Tcp { host, port } => {
            let listener = TcpListener::bind((host.as_str(), *port))
                .await
                .map_err(|source| ServeError::bind(endpoint, source))?;
            reporter.server_listening(endpoint);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(ServeError::serve)?;
        }
        ListenEndpoint::Unix { path } => {
            serve_unix(endpoint, path.as_std_path(), app, reporter.as_ref()).await?;
        }
    }

    reporter.server_stopped();
    Ok(())
}

#[cfg(unix)]
async fn serve_unix(
    endpoint: &ListenEndpoint,
    path: &std::path::Path,
    app: AxumRouter,
    reporter: &dyn HealthReporter,
) -> Result<(), ServeError> {
    remove_stale_socket(path);
    let listener = tokio::net::UnixListener::bind(path)
        .map_err(|source| ServeError::bind(endpoint, source))?;
    reporter.server_listening(endpoint);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::serve)
}

#[cfg(not(unix))]
async fn serve_unix(
    endpoint: &ListenEndpoint,
    _path: &std::path::Path,
    _app: AxumRouter,
    _reporter: &dyn HealthReporter,
) -> Result<(), ServeError> {
    Err(ServeError::bind(
        endpoint,
        io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not available on this platform",
        ),
    ))
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => warn!(
            target: HTTP_TARGET,
            path = %path.display(),
            "removed stale socket"
        ),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => warn!(
            target: HTTP_TARGET,
            path = %path.display(),
            %error,
            "could not remove stale socket"
        ),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(target: HTTP_TARGET, %error, "failed to listen for shutdown signal");
    }
}
