//! Shared types for watched roots and logical document paths.

use std::path::{Component, Path, PathBuf};

use crate::documents::SlugSet;

/// One watched filesystem root and the rules applied to files under it.
///
/// Immutable once a watch task has been started for it; the task holds it
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Absolute directory being watched.
    pub root: PathBuf,
    /// Logical namespace prefix that replaces `root` in produced URIs.
    pub uri_prefix: String,
    /// File-name suffix that qualifies a file for indexing (e.g. ".md").
    pub extension: String,
    /// Documents tagged with any of these topics are never indexed.
    pub restricted_topics: SlugSet,
}

impl WatchSpec {
    pub fn new(
        root: impl Into<PathBuf>,
        uri_prefix: impl Into<String>,
        extension: impl Into<String>,
        restricted_topics: SlugSet,
    ) -> Self {
        Self {
            root: root.into(),
            uri_prefix: uri_prefix.into(),
            extension: extension.into(),
            restricted_topics,
        }
    }

    /// Check whether a path qualifies for indexing by its suffix.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.extension))
    }

    /// Map a real file path under `root` to its logical URI path.
    ///
    /// Returns `None` when the path is not below the root.
    pub fn uri_path_for(&self, file_path: &Path) -> Option<String> {
        let relative = file_path.strip_prefix(&self.root).ok()?;
        let relative = relative_to_uri(relative)?;
        Some(join_uri(&self.uri_prefix, &relative))
    }
}

/// Join prefix and relative path with exactly one `/` between them.
fn join_uri(prefix: &str, relative: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{prefix}{relative}")
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Render a relative path with `/` separators on every platform.
fn relative_to_uri(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiki_spec(prefix: &str) -> WatchSpec {
        WatchSpec::new("/wiki", prefix, ".md", SlugSet::new())
    }

    #[test]
    fn test_uri_path_prefix_with_trailing_slash() {
        let spec = wiki_spec("/w/");
        assert_eq!(
            spec.uri_path_for(Path::new("/wiki/a.md")).as_deref(),
            Some("/w/a.md")
        );
        assert_eq!(
            spec.uri_path_for(Path::new("/wiki/guides/setup.md")).as_deref(),
            Some("/w/guides/setup.md")
        );
    }

    #[test]
    fn test_uri_path_prefix_without_trailing_slash() {
        let spec = wiki_spec("/w");
        assert_eq!(
            spec.uri_path_for(Path::new("/wiki/a.md")).as_deref(),
            Some("/w/a.md")
        );
    }

    #[test]
    fn test_uri_path_outside_root() {
        let spec = wiki_spec("/w/");
        assert!(spec.uri_path_for(Path::new("/other/a.md")).is_none());
        assert!(spec.uri_path_for(Path::new("/wiki")).is_none());
    }

    #[test]
    fn test_matches_extension() {
        let spec = wiki_spec("/w/");
        assert!(spec.matches(Path::new("/wiki/a.md")));
        assert!(!spec.matches(Path::new("/wiki/a.md.swp")));
        assert!(!spec.matches(Path::new("/wiki/notes.txt")));
    }
}
