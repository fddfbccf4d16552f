//! REST scenario world backed by a temporary root directory.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::http::Method;
use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;

use cumulus_archive::FsCapabilities;
use cumulus_config::Config;

use crate::rest::{
    Platform, Reply, RestContext, RestError, RestRequest, Router, Routing, TracingProgressSink,
};

/// State shared by REST steps.
pub struct RestWorld {
    dir: TempDir,
    router: Router,
    last_body: Option<String>,
    routing: Option<Routing>,
}

impl RestWorld {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create root directory");
        let router = Self::router_for(dir.path(), Platform::Other);
        Self {
            dir,
            router,
            last_body: None,
            routing: None,
        }
    }

    fn router_for(root: &Path, platform: Platform) -> Router {
        let config = Config {
            root: Utf8PathBuf::from_path_buf(root.to_path_buf()).expect("root was not UTF-8"),
            ..Config::default()
        };
        Self::router_with(&config, platform)
    }

    fn router_with(config: &Config, platform: Platform) -> Router {
        Router::new(RestContext::new(
            config,
            Arc::new(FsCapabilities),
            Arc::new(TracingProgressSink),
            platform,
        ))
    }

    /// Serves the filesystem root itself on a Windows host.
    pub fn use_windows_root_marker(&mut self) {
        self.router = Self::router_with(&Config::default(), Platform::Windows);
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directory");
        }
        fs::write(path, contents).expect("failed to write file");
    }

    pub fn send(&mut self, method: Method, path: &str, body: Option<String>) {
        let mut request = RestRequest::new(method, path);
        if let Some(body) = &body {
            request = request.with_body(body.as_bytes());
        }
        self.last_body = body;
        self.routing = Some(self.router.route(&request));
    }

    pub fn last_body(&self) -> Option<&str> {
        self.last_body.as_deref()
    }

    pub fn routing(&self) -> &Routing {
        self.routing.as_ref().expect("no request was sent")
    }

    pub fn reply(&self) -> &Reply {
        match self.routing() {
            Routing::Handled(Ok(reply)) => reply,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    pub fn error(&self) -> &RestError {
        match self.routing() {
            Routing::Handled(Err(error)) => error,
            other => panic!("expected an error, got {other:?}"),
        }
    }
}

#[fixture]
pub fn rest_world() -> RefCell<RestWorld> {
    RefCell::new(RestWorld::new())
}
