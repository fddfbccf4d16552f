//! Configuration loaders for bootstrap success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use cumulus_config::{Config, ListenEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that places the listen socket inside a temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
    listen: Option<ListenEndpoint>,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create socket directory"),
            listen: None,
        }
    }

    /// Overrides the listen endpoint.
    pub fn with_listen(mut self, listen: ListenEndpoint) -> Self {
        self.listen = Some(listen);
        self
    }

    fn socket_endpoint(&self) -> ListenEndpoint {
        let path = self.socket_dir.path().join("run").join("cumulusd.sock");
        ListenEndpoint::unix(
            Utf8PathBuf::from_path_buf(path).expect("socket path was not valid UTF-8"),
        )
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: self
                .listen
                .clone()
                .unwrap_or_else(|| self.socket_endpoint()),
            log_filter: String::from("cumulusd=debug"),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unusable listen address on the command
/// line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(vec![
            OsString::from("cumulusd"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ])
    }
}
