//! Archive container selection for pack operations.
//!
//! The server packs either gzip-compressed tarballs or zip files. The choice
//! is read-only: the REST layer captures it when its context is built and
//! uses it for every pack call, including streamed `GET` packs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Archive container produced by pack operations.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (`.tar.gz`).
    #[default]
    Tar,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// File extension, including the leading dot, used for archives of this
    /// format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tar => ".tar.gz",
            Self::Zip => ".zip",
        }
    }

    /// Detects the format from an archive file name.
    ///
    /// Names ending in `.zip` (case-insensitive) are zip archives; everything
    /// else is treated as a gzip-compressed tarball.
    #[must_use]
    pub fn detect(file_name: &str) -> Self {
        if file_name.to_ascii_lowercase().ends_with(Self::Zip.extension()) {
            Self::Zip
        } else {
            Self::Tar
        }
    }

    /// Removes this format's extension from the end of `name` when present.
    #[must_use]
    pub fn strip_extension(self, name: &str) -> &str {
        name.strip_suffix(self.extension()).unwrap_or(name)
    }

    /// MIME type advertised when streaming archives of this format.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Tar => "application/gzip",
            Self::Zip => "application/zip",
        }
    }
}

/// Errors encountered while parsing an [`ArchiveFormat`] from text.
pub type ArchiveFormatParseError = strum::ParseError;
