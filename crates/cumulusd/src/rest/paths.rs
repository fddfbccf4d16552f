//! Client path resolution beneath the configured root.
//!
//! Resolution is purely lexical: the filesystem is never consulted, so
//! symbolic links inside the root are followed by the capabilities as they
//! find them. Resolved paths are wrapped in [`ResolvedPath`], which only this
//! module can construct.

use std::path::{Component, Path, PathBuf};

use cumulus_config::ROOT_MARKER;

use super::errors::RestError;

/// Absolute path guaranteed to lie at or below the resolver's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    depth: usize,
}

impl ResolvedPath {
    /// Borrowed filesystem path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Owned filesystem path.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    /// Whether this is the root itself.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Final path component as text; the root's own name when at the root.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Splits into the parent directory and the final component.
    ///
    /// The root has no parent inside the sandbox, so splitting it fails.
    pub fn split_leaf(&self) -> Result<(Self, String), RestError> {
        if self.is_root() {
            return Err(RestError::invalid_operand(
                self.path.display().to_string(),
                "the root directory has no parent",
            ));
        }
        let leaf = self.file_name();
        let parent = self
            .path
            .parent()
            .map_or_else(|| self.path.clone(), Path::to_path_buf);
        Ok((
            Self {
                path: parent,
                depth: self.depth.saturating_sub(1),
            },
            leaf,
        ))
    }

    /// Sibling path whose final component has `suffix` appended.
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, RestError> {
        let (parent, leaf) = self.split_leaf()?;
        Ok(Self {
            path: parent.path.join(format!("{leaf}{suffix}")),
            depth: self.depth,
        })
    }

    /// Sibling path whose final component loses `suffix` when present.
    #[must_use]
    pub fn without_suffix(&self, suffix: &str) -> Self {
        let leaf = self.file_name();
        match leaf.strip_suffix(suffix) {
            Some(stem) if !self.is_root() && !stem.is_empty() => Self {
                path: self.path.with_file_name(stem),
                depth: self.depth,
            },
            _ => self.clone(),
        }
    }
}

/// Resolves client-supplied paths against a fixed root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` beneath the root.
    ///
    /// Both `/` and `\` separate segments. Empty and `.` segments are
    /// dropped and `..` removes the previous segment, stopping at the root.
    /// Segments that the platform would read as a drive or prefix are
    /// rejected.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, RestError> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other if is_single_component(other) => segments.push(other),
                _ => {
                    return Err(RestError::invalid_operand(
                        relative,
                        "path segment is not a plain name",
                    ));
                }
            }
        }
        let mut path = self.root.clone();
        path.extend(&segments);
        Ok(ResolvedPath {
            path,
            depth: segments.len(),
        })
    }

    /// Validates entry names that capabilities join onto resolved
    /// directories. Each name must be exactly one plain path component.
    pub fn resolve_names(&self, names: &[String]) -> Result<Vec<String>, RestError> {
        names
            .iter()
            .map(|name| {
                if name.contains(['/', '\\']) || !is_single_component(name) {
                    Err(RestError::invalid_operand(
                        name.as_str(),
                        "entry names must be a single path component",
                    ))
                } else {
                    Ok(name.clone())
                }
            })
            .collect()
    }
}

fn is_single_component(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Host platform as seen by the [`RootGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Anything else.
    Other,
}

impl Platform {
    /// Platform the server was compiled for.
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Blocks move and copy operations that address the filesystem root on
/// Windows while the configured root is the root marker.
#[derive(Debug, Clone, Copy)]
pub struct RootGuard {
    root_is_marker: bool,
    platform: Platform,
}

impl RootGuard {
    /// Builds a guard for a configuration and platform.
    #[must_use]
    pub const fn new(root_is_marker: bool, platform: Platform) -> Self {
        Self {
            root_is_marker,
            platform,
        }
    }

    /// Whether the configuration and the platform put the real root at risk.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.platform == Platform::Windows && self.root_is_marker
    }

    /// True when the guard is armed and any raw client path is the root
    /// marker.
    #[must_use]
    pub fn is_triggered(&self, paths: &[&str]) -> bool {
        self.is_armed() && paths.iter().any(|path| *path == ROOT_MARKER)
    }

    /// True when the guard is armed and any resolved operand is the root,
    /// whatever spelling the client used for it.
    #[must_use]
    pub fn covers(&self, paths: &[&ResolvedPath]) -> bool {
        self.is_armed() && paths.iter().any(|path| path.is_root())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn resolver() -> PathResolver {
        PathResolver::new("/srv/files")
    }

    #[rstest]
    #[case::plain("/docs/a.txt", "/srv/files/docs/a.txt")]
    #[case::relative("docs", "/srv/files/docs")]
    #[case::empty("", "/srv/files")]
    #[case::slash("/", "/srv/files")]
    #[case::dots("/docs/./nested/../a.txt", "/srv/files/docs/a.txt")]
    #[case::clamped("/../../etc/passwd", "/srv/files/etc/passwd")]
    #[case::backslash("docs\\a.txt", "/srv/files/docs/a.txt")]
    #[case::doubled("//docs//a.txt", "/srv/files/docs/a.txt")]
    fn resolves_inside_root(
        resolver: PathResolver,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let resolved = resolver.resolve(input).expect("resolves");
        assert_eq!(resolved.as_path(), Path::new(expected));
        assert!(resolved.as_path().starts_with(resolver.root()));
    }

    #[rstest]
    #[case::parent("..")]
    #[case::nested("docs/a.txt")]
    #[case::backslash("docs\\a.txt")]
    #[case::dot(".")]
    #[case::empty("")]
    fn rejects_compound_names(resolver: PathResolver, #[case] name: &str) {
        let error = resolver
            .resolve_names(&[String::from(name)])
            .expect_err("name must be rejected");
        assert!(matches!(error, RestError::InvalidOperand { .. }));
    }

    #[rstest]
    fn accepts_plain_names(resolver: PathResolver) {
        let names = vec![String::from("a.txt"), String::from("b c.txt")];
        assert_eq!(resolver.resolve_names(&names).expect("valid"), names);
    }

    #[rstest]
    fn splits_parent_and_leaf(resolver: PathResolver) {
        let resolved = resolver.resolve("docs/report").expect("resolves");
        let (parent, leaf) = resolved.split_leaf().expect("splits");
        assert_eq!(parent.as_path(), Path::new("/srv/files/docs"));
        assert_eq!(leaf, "report");
    }

    #[rstest]
    fn root_cannot_be_split(resolver: PathResolver) {
        let resolved = resolver.resolve("/").expect("resolves");
        assert!(resolved.split_leaf().is_err());
        assert!(resolved.with_suffix(".zip").is_err());
    }

    #[rstest]
    fn suffix_helpers_stay_in_directory(resolver: PathResolver) {
        let archive = resolver.resolve("a.tar.gz").expect("resolves");
        assert_eq!(
            archive.without_suffix(".tar.gz").as_path(),
            Path::new("/srv/files/a")
        );
        let docs = resolver.resolve("docs").expect("resolves");
        assert_eq!(
            docs.with_suffix(".zip").expect("suffix").as_path(),
            Path::new("/srv/files/docs.zip")
        );
    }

    #[rstest]
    #[case::all_conditions(true, Platform::Windows, "/", true)]
    #[case::other_platform(true, Platform::Other, "/", false)]
    #[case::custom_root(false, Platform::Windows, "/", false)]
    #[case::not_root(true, Platform::Windows, "/docs", false)]
    fn root_guard_requires_every_condition(
        #[case] root_is_marker: bool,
        #[case] platform: Platform,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let guard = RootGuard::new(root_is_marker, platform);
        assert_eq!(guard.is_triggered(&["/elsewhere", path]), expected);
    }

    #[rstest]
    #[case::marker("/")]
    #[case::doubled("//")]
    #[case::dot("/.")]
    #[case::backslash("\\")]
    #[case::climb("/docs/..")]
    fn root_guard_covers_root_aliases(#[case] alias: &str) {
        let resolver = PathResolver::new("/");
        let root = resolver.resolve(alias).expect("resolves");
        let docs = resolver.resolve("/docs").expect("resolves");

        assert!(RootGuard::new(true, Platform::Windows).covers(&[&docs, &root]));
        assert!(!RootGuard::new(true, Platform::Other).covers(&[&root]));
        assert!(!RootGuard::new(false, Platform::Windows).covers(&[&root]));
        assert!(!RootGuard::new(true, Platform::Windows).covers(&[&docs]));
    }
}
