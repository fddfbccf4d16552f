//! Prefix and method matching for API requests.

use axum::http::Method;
use tracing::debug;

use super::{REST_TARGET, RestContext, RestRequest, Routing, dispatch};

/// Matches requests against the API prefix and hands them to the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct Router {
    context: RestContext,
}

impl Router {
    /// Creates a router over `context`.
    #[must_use]
    pub const fn new(context: RestContext) -> Self {
        Self { context }
    }

    /// Shared request context.
    #[must_use]
    pub const fn context(&self) -> &RestContext {
        &self.context
    }

    /// Command name for a request the API handles, or `None` when the request
    /// belongs to the next handler.
    ///
    /// The query string is ignored and the prefix removed; an empty
    /// remainder becomes `/`. Only `GET` and `PUT` are handled.
    #[must_use]
    pub fn command_name(&self, method: &Method, path: &str) -> Option<String> {
        if method != Method::GET && method != Method::PUT {
            return None;
        }
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let name = path.strip_prefix(self.context.prefix())?;
        Some(if name.is_empty() { "/" } else { name }.to_owned())
    }

    /// Routes `request`.
    #[must_use]
    pub fn route(&self, request: &RestRequest) -> Routing {
        let Some(name) = self.command_name(request.method(), request.path()) else {
            return Routing::Next;
        };
        debug!(
            target: REST_TARGET,
            method = %request.method(),
            command = %name,
            "routing API request"
        );
        let outcome = if request.method() == Method::GET {
            dispatch::get(&self.context, &name)
        } else {
            dispatch::put(&self.context, &name, request.body())
        };
        Routing::Handled(outcome)
    }
}
