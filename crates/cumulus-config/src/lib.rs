//! Shared configuration for the Cumulus file-operation server.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file named with `--config-path`, then `CUMULUS_*`
//! environment variables, and finally command-line flags. The values are
//! read-only for the lifetime of the process; the REST layer receives them
//! through explicit constructors rather than looking them up globally.
//!
//! ```toml
//! root = "/srv/files"
//! prefix = "/api/v1"
//! packer = "zip"
//! listen = { transport = "tcp", host = "0.0.0.0", port = 8000 }
//! log_filter = "cumulusd=debug"
//! log_format = "compact"
//! ```

mod archive;
mod defaults;
mod listen;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use archive::{ArchiveFormat, ArchiveFormatParseError};
pub use defaults::{
    DEFAULT_API_PREFIX, DEFAULT_LOG_FILTER, DEFAULT_ROOT, DEFAULT_TCP_PORT,
    default_listen_endpoint, default_log_filter, default_log_filter_string, default_log_format,
    default_packer, default_prefix, default_root,
};
pub use listen::{ListenEndpoint, ListenParseError, ListenPreparationError};
pub use logging::{LogFormat, LogFormatParseError};

/// Literal marker naming the filesystem root.
pub const ROOT_MARKER: &str = "/";

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CUMULUS")]
pub struct Config {
    /// Directory that every client path is resolved beneath.
    #[serde(default = "default_root")]
    #[ortho_config(default = default_root())]
    pub root: Utf8PathBuf,
    /// Path prefix under which the REST API is mounted.
    #[serde(default = "default_prefix")]
    #[ortho_config(default = default_prefix())]
    pub prefix: String,
    /// Archive container produced by pack operations.
    #[serde(default = "default_packer")]
    #[ortho_config(default = default_packer())]
    pub packer: ArchiveFormat,
    /// Endpoint the HTTP server listens on.
    #[serde(default = "default_listen_endpoint")]
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// Tracing filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            prefix: default_prefix(),
            packer: default_packer(),
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Directory that every client path is resolved beneath.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }

    /// Whether the configured root is the literal filesystem root marker.
    #[must_use]
    pub fn root_is_marker(&self) -> bool {
        self.root.as_str() == ROOT_MARKER
    }

    /// API prefix without a trailing separator (`/` becomes empty).
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    /// Archive container produced by pack operations.
    #[must_use]
    pub const fn packer(&self) -> ArchiveFormat {
        self.packer
    }

    /// Endpoint the HTTP server listens on.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.root(), Utf8Path::new("/"));
        assert!(config.root_is_marker());
        assert_eq!(config.prefix(), "/api/v1");
        assert_eq!(config.packer(), ArchiveFormat::Tar);
        assert_eq!(config.listen(), &ListenEndpoint::tcp("127.0.0.1", 8000));
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn prefix_drops_trailing_separator() {
        let config = Config {
            prefix: String::from("/api/v1/"),
            ..Config::default()
        };
        assert_eq!(config.prefix(), "/api/v1");
    }

    #[test]
    fn non_marker_root_is_detected() {
        let config = Config {
            root: Utf8PathBuf::from("/srv/files"),
            ..Config::default()
        };
        assert!(!config.root_is_marker());
    }
}
