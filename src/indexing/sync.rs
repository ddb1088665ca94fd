//! The builder-to-index chain shared by the initial walk and the watchers.
//!
//! Failures here are per-file: they are logged with the file and key
//! involved and never abort the caller.

use std::path::Path;
use std::sync::Arc;

use crate::documents::{BuildOutcome, DocumentBuilder};
use crate::storage::IndexMutator;
use crate::types::WatchSpec;

/// Result of pushing one file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Record upserted.
    Indexed,
    /// Skipped because of a restricted topic; the index was not touched.
    Restricted,
    /// Unreadable, malformed or rejected by the index; left as it was.
    Failed,
}

/// Builds pages and applies them to an index.
pub struct SyncPipeline {
    builder: DocumentBuilder,
    mutator: Arc<dyn IndexMutator>,
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl SyncPipeline {
    pub fn new(builder: DocumentBuilder, mutator: Arc<dyn IndexMutator>) -> Self {
        Self { builder, mutator }
    }

    /// Build `file_path` and upsert it under `uri_path`.
    pub fn process_update(&self, file_path: &Path, uri_path: &str, spec: &WatchSpec) -> UpdateOutcome {
        match self.builder.build(file_path, uri_path, spec) {
            Ok(BuildOutcome::Ready(doc)) => match self.mutator.upsert(&doc) {
                Ok(()) => {
                    crate::log_event!("index", "updated", "{} as {uri_path}", file_path.display());
                    UpdateOutcome::Indexed
                }
                Err(e) => {
                    tracing::error!("[index] upsert of {uri_path} ({}) failed: {e}", file_path.display());
                    UpdateOutcome::Failed
                }
            },
            Ok(BuildOutcome::Restricted { title, topic }) => {
                crate::debug_event!(
                    "index",
                    "restricted",
                    "{} '{title}' has topic '{topic}'",
                    file_path.display()
                );
                UpdateOutcome::Restricted
            }
            Err(e) => {
                tracing::warn!("[index] skipped: {e}");
                UpdateOutcome::Failed
            }
        }
    }

    /// Remove `uri_path` from the index. Returns false if the store failed.
    pub fn process_delete(&self, uri_path: &str) -> bool {
        match self.mutator.delete(uri_path) {
            Ok(()) => {
                crate::log_event!("index", "deleted", "{uri_path}");
                true
            }
            Err(e) => {
                tracing::error!("[index] delete of {uri_path} failed: {e}");
                false
            }
        }
    }
}
