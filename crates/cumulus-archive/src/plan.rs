//! Walks source trees ahead of an operation so progress can be reported
//! against a known byte total.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CapabilityError;

/// Kind of filesystem entry found while planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// One entry to archive, copy or move.
#[derive(Debug, Clone)]
pub(crate) struct PlannedEntry {
    pub(crate) source: PathBuf,
    /// Path relative to the plan's base; empty for the base itself.
    pub(crate) relative: PathBuf,
    pub(crate) kind: EntryKind,
    pub(crate) len: u64,
}

impl PlannedEntry {
    /// Archive member name using `/` separators regardless of platform.
    pub(crate) fn archive_name(&self) -> String {
        let mut name = self
            .relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        if self.kind == EntryKind::Directory {
            name.push('/');
        }
        name
    }

    /// Destination for this entry below `target`.
    pub(crate) fn target_in(&self, target: &Path) -> PathBuf {
        if self.relative.as_os_str().is_empty() {
            target.to_path_buf()
        } else {
            target.join(&self.relative)
        }
    }
}

/// Ordered entries plus the number of file bytes they cover.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub(crate) entries: Vec<PlannedEntry>,
    pub(crate) total_bytes: u64,
}

impl Plan {
    /// Plans `base/name` for every name, with paths relative to `base`.
    pub(crate) fn for_names(base: &Path, names: &[String]) -> Result<Self, CapabilityError> {
        let mut plan = Self::default();
        for name in names {
            plan.extend(base, &base.join(name))?;
        }
        Ok(plan)
    }

    /// Plans the tree rooted at `start` with paths relative to `base`.
    pub(crate) fn for_tree(base: &Path, start: &Path) -> Result<Self, CapabilityError> {
        let mut plan = Self::default();
        plan.extend(base, start)?;
        Ok(plan)
    }

    fn extend(&mut self, base: &Path, start: &Path) -> Result<(), CapabilityError> {
        for item in WalkDir::new(start).follow_links(false).sort_by_file_name() {
            let entry = item.map_err(|error| CapabilityError::walk(start, error.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(base)
                .map_err(|error| CapabilityError::walk(entry.path(), error.to_string()))?
                .to_path_buf();
            let file_type = entry.file_type();
            let (kind, len) = if file_type.is_dir() {
                (EntryKind::Directory, 0)
            } else if file_type.is_symlink() {
                (EntryKind::Symlink, 0)
            } else {
                let metadata = entry
                    .metadata()
                    .map_err(|error| CapabilityError::walk(entry.path(), error.to_string()))?;
                (EntryKind::File, metadata.len())
            };
            self.total_bytes = self.total_bytes.saturating_add(len);
            self.entries.push(PlannedEntry {
                source: entry.path().to_path_buf(),
                relative,
                kind,
                len,
            });
        }
        Ok(())
    }
}

/// Tracks processed bytes against a total and converts them to a percentage.
#[derive(Debug)]
pub(crate) struct ByteProgress {
    total: u64,
    done: u64,
}

impl ByteProgress {
    pub(crate) const fn new(total: u64) -> Self {
        Self { total, done: 0 }
    }

    /// Records `bytes` more and returns the updated percentage.
    pub(crate) fn advance(&mut self, bytes: u64) -> u8 {
        self.done = self.done.saturating_add(bytes).min(self.total);
        self.percent()
    }

    pub(crate) fn percent(&self) -> u8 {
        percent_of(self.done, self.total)
    }
}

/// Integer percentage of `done` over `total`; an empty total counts as done.
pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = u128::from(done.min(total)) * 100 / u128::from(total);
    u8::try_from(scaled).unwrap_or(100)
}
