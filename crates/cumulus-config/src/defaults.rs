use camino::Utf8PathBuf;

use crate::archive::ArchiveFormat;
use crate::listen::ListenEndpoint;

/// Default TCP port for the HTTP listener.
pub const DEFAULT_TCP_PORT: u16 = 8000;

/// Default root directory exposed through the API.
pub const DEFAULT_ROOT: &str = "/";

/// Default path prefix under which the REST API is mounted.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default root directory exposed through the API.
pub fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_ROOT)
}

/// Owned API prefix used where allocation is required (e.g. serde).
pub fn default_prefix() -> String {
    DEFAULT_API_PREFIX.to_owned()
}

/// Default archive format for pack operations.
pub fn default_packer() -> ArchiveFormat {
    ArchiveFormat::Tar
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default listener: loopback TCP on [`DEFAULT_TCP_PORT`].
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
