//! Initial traversal of a watched root.
//!
//! Every qualifying file under the root is pushed through the pipeline
//! before the root's watch task starts. A listing error aborts the whole
//! walk; per-file build or index errors do not.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::sync::{SyncPipeline, UpdateOutcome};
use crate::types::WatchSpec;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Failed to list {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Counters for one completed walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Files whose name ended with the extension.
    pub files_seen: usize,
    pub indexed: usize,
    pub restricted: usize,
    pub failed: usize,
}

/// Walks one root in a deterministic order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryWalker;

impl DirectoryWalker {
    pub fn new() -> Self {
        Self
    }

    /// List qualifying files under `spec.root` with their URI paths.
    pub fn files(&self, spec: &WatchSpec) -> Result<Vec<(PathBuf, String)>, WalkError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&spec.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| WalkError::Listing {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| spec.root.clone()),
                source,
            })?;

            if !is_indexable_file(&entry) || !spec.matches(entry.path()) {
                continue;
            }

            if let Some(uri_path) = spec.uri_path_for(entry.path()) {
                files.push((entry.into_path(), uri_path));
            }
        }

        Ok(files)
    }

    /// Index every qualifying file under `spec.root`.
    ///
    /// Listing happens up front, so a listing error leaves the index untouched.
    pub fn walk(&self, spec: &WatchSpec, pipeline: &SyncPipeline) -> Result<WalkStats, WalkError> {
        let files = self.files(spec)?;
        let mut stats = WalkStats::default();

        for (file_path, uri_path) in files {
            stats.files_seen += 1;
            match pipeline.process_update(&file_path, &uri_path, spec) {
                UpdateOutcome::Indexed => stats.indexed += 1,
                UpdateOutcome::Restricted => stats.restricted += 1,
                UpdateOutcome::Failed => stats.failed += 1,
            }
        }

        crate::log_event!(
            "walk",
            "finished",
            "{}: {} seen, {} indexed, {} restricted, {} failed",
            spec.root.display(),
            stats.files_seen,
            stats.indexed,
            stats.restricted,
            stats.failed
        );

        Ok(stats)
    }
}

/// Regular files, and symlinks that resolve to one. Linked directories
/// are not descended into.
fn is_indexable_file(entry: &walkdir::DirEntry) -> bool {
    if entry.path_is_symlink() {
        std::fs::metadata(entry.path()).is_ok_and(|metadata| metadata.is_file())
    } else {
        entry.file_type().is_file()
    }
}
