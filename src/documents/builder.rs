//! Turns a file on disk into an indexable page record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use thiserror::Error;

use super::frontmatter::{self, FrontMatterError};
use super::render::Renderer;
use super::types::IndexedDocument;
use crate::types::WatchSpec;

/// Errors that leave a page at its previously indexed state.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed front-matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
}

/// What the builder decided for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Ready to be upserted.
    Ready(IndexedDocument),
    /// Tagged with a restricted topic; must not reach the index.
    Restricted { title: String, topic: String },
}

/// Composes front-matter, rendered body and file metadata into a record.
#[derive(Clone)]
pub struct DocumentBuilder {
    renderer: Arc<dyn Renderer>,
}

impl std::fmt::Debug for DocumentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBuilder").finish_non_exhaustive()
    }
}

impl DocumentBuilder {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Build the record for `file_path`, stored under `uri_path`.
    pub fn build(
        &self,
        file_path: &Path,
        uri_path: &str,
        spec: &WatchSpec,
    ) -> Result<BuildOutcome, BuildError> {
        let io_error = |source| BuildError::Io {
            path: file_path.to_path_buf(),
            source,
        };

        let bytes = std::fs::read(file_path).map_err(io_error)?;
        let modified = std::fs::metadata(file_path)
            .and_then(|meta| meta.modified())
            .map_err(io_error)?;

        let parsed = frontmatter::parse(&bytes).map_err(|source| BuildError::FrontMatter {
            path: file_path.to_path_buf(),
            source,
        })?;

        if let Some(topic) = parsed.topics.first_shared(&spec.restricted_topics) {
            return Ok(BuildOutcome::Restricted {
                topic: topic.to_string(),
                title: parsed.title,
            });
        }

        let modified = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(BuildOutcome::Ready(IndexedDocument {
            uri_path: uri_path.to_string(),
            body: self.renderer.render(&parsed.body),
            topics: parsed.topics.joined(),
            keywords: parsed.keywords.joined(),
            authors: parsed.authors.joined(),
            title: parsed.title,
            modified,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{PlainTextRenderer, SlugSet};
    use std::fs;
    use tempfile::TempDir;

    fn builder() -> DocumentBuilder {
        DocumentBuilder::new(Arc::new(PlainTextRenderer::new()))
    }

    fn spec(root: &Path, restricted: &[&str]) -> WatchSpec {
        WatchSpec::new(
            root,
            "/w/",
            ".md",
            restricted.iter().collect::<SlugSet>(),
        )
    }

    #[test]
    fn test_build_ready_document() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.md");
        fs::write(
            &file,
            "tag: howto\nkeyword=setup\nauthor: Jane Doe\nGetting Started\n===\nHello *world*.\n",
        )
        .unwrap();

        let outcome = builder()
            .build(&file, "/w/a.md", &spec(temp_dir.path(), &[]))
            .unwrap();

        let doc = match outcome {
            BuildOutcome::Ready(doc) => doc,
            other => panic!("expected a ready document, got {other:?}"),
        };
        assert_eq!(doc.uri_path, "/w/a.md");
        assert_eq!(doc.title, "Getting Started");
        assert_eq!(doc.topics, "howto");
        assert_eq!(doc.keywords, "setup");
        assert_eq!(doc.authors, "Jane-Doe");
        assert_eq!(doc.body, "Hello world.");
        assert!(doc.modified > 0);
    }

    #[test]
    fn test_build_restricted_topic() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("secret.md");
        fs::write(&file, "tag: internal only\nPlans\n===\nDo not index.\n").unwrap();

        let outcome = builder()
            .build(&file, "/w/secret.md", &spec(temp_dir.path(), &["internal only"]))
            .unwrap();

        assert_eq!(
            outcome,
            BuildOutcome::Restricted {
                title: "Plans".to_string(),
                topic: "internal-only".to_string(),
            }
        );
    }

    #[test]
    fn test_build_malformed_page() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("bad.md");
        fs::write(&file, "no title here\n").unwrap();

        let err = builder()
            .build(&file, "/w/bad.md", &spec(temp_dir.path(), &[]))
            .unwrap_err();
        assert!(matches!(err, BuildError::FrontMatter { .. }));
    }

    #[test]
    fn test_build_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("gone.md");

        let err = builder()
            .build(&file, "/w/gone.md", &spec(temp_dir.path(), &[]))
            .unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}
