//! Lifecycle of the watch tasks for every enabled index.
//!
//! The supervisor owns the handles; nothing about running watchers lives in
//! global state. Enabling an index walks each of its roots once and only
//! then starts that root's watch task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::error::WatchError;
use super::root::{RootWatcher, WatchHandle, WatchSummary};
use crate::config::IndexSection;
use crate::documents::{DocumentBuilder, Renderer};
use crate::indexing::{DirectoryWalker, SyncPipeline, WalkError, WalkStats};
use crate::storage::{StorageError, TantivyStore};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Cannot prepare index: {0}")]
    Store(#[from] StorageError),

    #[error("Background task failed: {0}")]
    Join(String),
}

/// What `enable` did for each root of an index.
#[derive(Debug, Default)]
pub struct EnableReport {
    /// Roots that were walked and are now watched.
    pub started: Vec<(PathBuf, WalkStats)>,
    /// Roots whose walk failed; they have no watch task.
    pub failed: Vec<(PathBuf, WalkError)>,
}

/// Owns every running watch task.
#[derive(Debug, Default)]
pub struct SyncSupervisor {
    handles: Vec<WatchHandle>,
    /// Parent of every task's token.
    shutdown: CancellationToken,
}

impl SyncSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the index, walk each root and start watching it.
    ///
    /// Fails only if the index itself cannot be opened or created. A root
    /// that cannot be walked is reported and skipped.
    pub async fn enable(
        &mut self,
        section: &IndexSection,
        renderer: Arc<dyn Renderer>,
    ) -> Result<EnableReport, SyncError> {
        let path = section.path.clone();
        let name = section.name.clone();
        let analyzer = section.analyzer.clone();
        let store = tokio::task::spawn_blocking(move || TantivyStore::ensure(path, &name, &analyzer))
            .await
            .map_err(|e| SyncError::Join(e.to_string()))??;

        let pipeline = Arc::new(SyncPipeline::new(
            DocumentBuilder::new(renderer),
            Arc::new(store),
        ));
        let window = Duration::from_millis(section.debounce_ms);
        let mut report = EnableReport::default();

        for spec in section.watch_specs() {
            let spec = Arc::new(spec);
            let walked = {
                let spec = Arc::clone(&spec);
                let pipeline = Arc::clone(&pipeline);
                tokio::task::spawn_blocking(move || DirectoryWalker::new().walk(&spec, &pipeline))
                    .await
                    .map_err(|e| SyncError::Join(e.to_string()))?
            };

            match walked {
                Ok(stats) => {
                    let handle = RootWatcher::spawn(
                        Arc::clone(&spec),
                        Arc::clone(&pipeline),
                        window,
                        self.shutdown.child_token(),
                    );
                    self.handles.push(handle);
                    report.started.push((spec.root.clone(), stats));
                }
                Err(e) => {
                    tracing::error!("[sync] {}: walk failed, not watching: {e}", spec.root.display());
                    report.failed.push((spec.root.clone(), e));
                }
            }
        }

        crate::log_event!(
            "sync",
            "enabled",
            "index '{}': {} watched, {} failed",
            section.name,
            report.started.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Stop the watch tasks for `root`. Returns false if none was running.
    pub async fn stop(&mut self, root: &Path) -> bool {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.handles)
            .into_iter()
            .partition(|handle| handle.root() == root);
        self.handles = rest;

        let stopped = !matching.is_empty();
        for handle in matching {
            log_stopped(root, handle.stop().await);
        }
        stopped
    }

    /// Stop every watch task and wait for all of them. Safe to call again.
    pub async fn disable_all(&mut self) {
        self.shutdown.cancel();

        for handle in std::mem::take(&mut self.handles) {
            let root = handle.root().to_path_buf();
            log_stopped(&root, handle.join().await);
        }

        self.shutdown = CancellationToken::new();
    }

    /// Collect tasks that ended on their own, with the error that ended them.
    pub async fn reap(&mut self) -> Vec<(PathBuf, WatchError)> {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.handles)
            .into_iter()
            .partition(WatchHandle::is_finished);
        self.handles = running;

        let mut dead = Vec::new();
        for handle in finished {
            let root = handle.root().to_path_buf();
            match handle.join().await {
                Ok(summary) => log_stopped(&root, Ok(summary)),
                Err(e) => {
                    tracing::error!("[sync] {}: watch ended: {e}", root.display());
                    dead.push((root, e));
                }
            }
        }
        dead
    }

    /// Roots with a watch task, in the order they were enabled.
    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.handles
            .iter()
            .map(|handle| handle.root().to_path_buf())
            .collect()
    }
}

fn log_stopped(root: &Path, result: Result<WatchSummary, WatchError>) {
    match result {
        Ok(summary) => crate::debug_event!(
            "sync",
            "stopped",
            "{}: {} flushes, {} changes applied",
            root.display(),
            summary.flushes,
            summary.changes_applied
        ),
        Err(e) => tracing::warn!("[sync] {}: watch ended with error: {e}", root.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::PlainTextRenderer;
    use std::fs;
    use tempfile::TempDir;

    fn section(temp_dir: &TempDir, roots: &[(&str, &str)]) -> IndexSection {
        let mut section = IndexSection::new("wiki", temp_dir.path().join("index"));
        section.debounce_ms = 100;
        section.restricted = vec!["private".to_string()];
        for (dir, prefix) in roots {
            section
                .watch_dirs
                .insert(temp_dir.path().join(dir), prefix.to_string());
        }
        section
    }

    fn renderer() -> Arc<dyn Renderer> {
        Arc::new(PlainTextRenderer::new())
    }

    #[tokio::test]
    async fn test_enable_walks_then_watches() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("wiki")).unwrap();
        fs::write(temp_dir.path().join("wiki/a.md"), "A\n=\n").unwrap();

        let section = section(&temp_dir, &[("wiki", "/w/")]);
        let mut supervisor = SyncSupervisor::new();
        let report = supervisor.enable(&section, renderer()).await.unwrap();

        assert_eq!(report.started.len(), 1);
        assert_eq!(report.started[0].1.indexed, 1);
        assert!(report.failed.is_empty());
        assert_eq!(supervisor.watched_roots(), vec![temp_dir.path().join("wiki")]);

        let store = TantivyStore::new(temp_dir.path().join("index"));
        assert_eq!(store.get("/w/a.md").unwrap().unwrap().title, "A");

        supervisor.disable_all().await;
        assert!(supervisor.watched_roots().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_reported_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("wiki")).unwrap();

        let section = section(&temp_dir, &[("wiki", "/w/"), ("gone", "/g/")]);
        let mut supervisor = SyncSupervisor::new();
        let report = supervisor.enable(&section, renderer()).await.unwrap();

        assert_eq!(report.started.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, temp_dir.path().join("gone"));
        assert_eq!(supervisor.watched_roots(), vec![temp_dir.path().join("wiki")]);
        assert!(supervisor.reap().await.is_empty());

        supervisor.disable_all().await;
    }

    #[tokio::test]
    async fn test_unknown_analyzer_fails_enable() {
        let temp_dir = TempDir::new().unwrap();
        let mut section = section(&temp_dir, &[]);
        section.analyzer = "klingon".to_string();

        let mut supervisor = SyncSupervisor::new();
        let result = supervisor.enable(&section, renderer()).await;

        assert!(matches!(
            result,
            Err(SyncError::Store(StorageError::UnknownAnalyzer(_)))
        ));
    }

    #[tokio::test]
    async fn test_stop_and_disable_all_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();

        let section = section(&temp_dir, &[("a", "/a/"), ("b", "/b/")]);
        let mut supervisor = SyncSupervisor::new();
        supervisor.enable(&section, renderer()).await.unwrap();
        assert_eq!(supervisor.watched_roots().len(), 2);

        assert!(supervisor.stop(&temp_dir.path().join("a")).await);
        assert!(!supervisor.stop(&temp_dir.path().join("a")).await);
        assert_eq!(supervisor.watched_roots(), vec![temp_dir.path().join("b")]);

        supervisor.disable_all().await;
        supervisor.disable_all().await;
        assert!(supervisor.watched_roots().is_empty());

        // A fresh enable after disable_all still gets live tasks
        supervisor.enable(&section, renderer()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(supervisor.reap().await.is_empty());
        supervisor.disable_all().await;
    }

    #[tokio::test]
    async fn test_reap_collects_dead_watchers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("vanishing");
        let spec = crate::types::WatchSpec::new(&root, "/v/", ".md", Default::default());
        let pipeline = SyncPipeline::new(
            DocumentBuilder::new(renderer()),
            Arc::new(crate::storage::MemoryIndex::new()),
        );

        let mut supervisor = SyncSupervisor::new();
        supervisor.handles.push(RootWatcher::spawn(
            Arc::new(spec),
            Arc::new(pipeline),
            Duration::from_millis(100),
            supervisor.shutdown.child_token(),
        ));

        let mut dead = Vec::new();
        for _ in 0..100 {
            dead = supervisor.reap().await;
            if !dead.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0, root);
        assert!(matches!(dead[0].1, WatchError::PathWatchFailed { .. }));
        assert!(supervisor.watched_roots().is_empty());
    }

    #[tokio::test]
    async fn test_removed_root_is_reaped_while_others_run() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();

        let section = section(&temp_dir, &[("a", "/a/"), ("b", "/b/")]);
        let mut supervisor = SyncSupervisor::new();
        supervisor.enable(&section, renderer()).await.unwrap();

        fs::remove_dir_all(temp_dir.path().join("a")).unwrap();

        let mut dead = Vec::new();
        for _ in 0..500 {
            dead = supervisor.reap().await;
            if !dead.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0, temp_dir.path().join("a"));
        assert!(matches!(dead[0].1, WatchError::RootRemoved { .. }));
        assert_eq!(supervisor.watched_roots(), vec![temp_dir.path().join("b")]);

        supervisor.disable_all().await;
    }
}
