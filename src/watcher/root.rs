//! Per-root watch task.
//!
//! Each watched root owns one notify watcher and one tokio task. Events are
//! batched until the root has been quiet for the whole debounce window, then
//! applied in arrival order on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::debouncer::EventBatch;
use super::error::WatchError;
use super::event::{ChangeKind, FsChange};
use crate::indexing::{SyncPipeline, UpdateOutcome};
use crate::types::WatchSpec;

/// Default idle window before pending changes are applied.
pub const DEFAULT_DEBOUNCE_MS: u64 = 10_000;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Counters for one flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub upserted: usize,
    pub deleted: usize,
    pub restricted: usize,
    pub failed: usize,
    /// Wrong extension, outside the root or a non-content change.
    pub ignored: usize,
}

impl FlushStats {
    /// Changes that reached the index.
    pub fn applied(&self) -> usize {
        self.upserted + self.deleted
    }
}

/// Returned by a watch task that was cancelled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub flushes: usize,
    pub changes_applied: usize,
}

/// Apply a drained batch to the index in arrival order.
pub fn apply_changes(pipeline: &SyncPipeline, spec: &WatchSpec, changes: &[FsChange]) -> FlushStats {
    let mut stats = FlushStats::default();

    for change in changes {
        if change.kind == ChangeKind::Other || !spec.matches(&change.path) {
            stats.ignored += 1;
            continue;
        }
        let Some(uri_path) = spec.uri_path_for(&change.path) else {
            stats.ignored += 1;
            continue;
        };

        match change.kind {
            ChangeKind::Remove | ChangeKind::Rename => {
                if pipeline.process_delete(&uri_path) {
                    stats.deleted += 1;
                } else {
                    stats.failed += 1;
                }
            }
            ChangeKind::Create | ChangeKind::Write => {
                match pipeline.process_update(&change.path, &uri_path, spec) {
                    UpdateOutcome::Indexed => stats.upserted += 1,
                    UpdateOutcome::Restricted => stats.restricted += 1,
                    UpdateOutcome::Failed => stats.failed += 1,
                }
            }
            ChangeKind::Other => stats.ignored += 1,
        }
    }

    stats
}

/// State owned by a running watch task.
pub struct RootWatcher {
    spec: Arc<WatchSpec>,
    pipeline: Arc<SyncPipeline>,
    batch: EventBatch,
    events: mpsc::Receiver<notify::Result<Event>>,
    /// Dropping the watcher closes the event channel.
    _watcher: RecommendedWatcher,
}

impl RootWatcher {
    /// Register a recursive watch on `spec.root` and start its task.
    ///
    /// Registration happens before this returns, so changes made afterwards
    /// are observed. A registration failure does not panic; the returned
    /// handle resolves to the error.
    pub fn spawn(
        spec: Arc<WatchSpec>,
        pipeline: Arc<SyncPipeline>,
        window: Duration,
        cancel: CancellationToken,
    ) -> WatchHandle {
        let root = spec.root.clone();

        let join = match Self::register(&spec.root) {
            Ok((watcher, events)) => {
                let task = RootWatcher {
                    spec,
                    pipeline,
                    batch: EventBatch::new(window),
                    events,
                    _watcher: watcher,
                };
                tokio::spawn(task.run(cancel.clone()))
            }
            Err(e) => {
                tracing::error!("[watcher] {e}");
                tokio::spawn(async move { Err(e) })
            }
        };

        WatchHandle { root, cancel, join }
    }

    fn register(
        root: &Path,
    ) -> Result<(RecommendedWatcher, mpsc::Receiver<notify::Result<Event>>), WatchError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "watching", "{}", root.display());
        Ok((watcher, rx))
    }

    async fn run(mut self, cancel: CancellationToken) -> Result<WatchSummary, WatchError> {
        crate::log_event!(
            "watcher",
            "started",
            "{} (window {}ms)",
            self.spec.root.display(),
            self.batch.window().as_millis()
        );

        let mut summary = WatchSummary::default();

        loop {
            let deadline = self.batch.deadline();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if !self.batch.is_empty() {
                        tracing::warn!(
                            "[watcher] {}: dropping {} unflushed changes",
                            self.spec.root.display(),
                            self.batch.len()
                        );
                    }
                    crate::log_event!("watcher", "stopped", "{}", self.spec.root.display());
                    return Ok(summary);
                }

                _ = wait_until(deadline) => {
                    self.flush(&mut summary).await?;
                }

                received = self.events.recv() => {
                    match received {
                        Some(Ok(event)) => {
                            let changes = FsChange::from_notify(event);
                            let removal = changes
                                .iter()
                                .any(|c| matches!(c.kind, ChangeKind::Remove | ChangeKind::Rename));
                            self.batch.extend(changes);

                            if removal && !self.spec.root.is_dir() {
                                tracing::error!(
                                    "[watcher] {}: watched directory removed, stopping",
                                    self.spec.root.display()
                                );
                                self.drain_queued();
                                self.flush(&mut summary).await?;
                                return Err(WatchError::RootRemoved {
                                    root: self.spec.root.clone(),
                                });
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!(
                                "[watcher] {}: file watch error: {e}",
                                self.spec.root.display()
                            );
                            self.flush(&mut summary).await?;
                            return Err(WatchError::Transport {
                                root: self.spec.root.clone(),
                                details: e.to_string(),
                            });
                        }
                        None => {
                            self.flush(&mut summary).await?;
                            return Err(WatchError::ChannelClosed);
                        }
                    }
                }
            }
        }
    }

    /// Move events already queued in the channel into the batch.
    fn drain_queued(&mut self) {
        while let Ok(Ok(event)) = self.events.try_recv() {
            self.batch.extend(FsChange::from_notify(event));
        }
    }

    async fn flush(&mut self, summary: &mut WatchSummary) -> Result<(), WatchError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let changes = self.batch.take();
        let spec = Arc::clone(&self.spec);
        let pipeline = Arc::clone(&self.pipeline);

        let stats = tokio::task::spawn_blocking(move || apply_changes(&pipeline, &spec, &changes))
            .await
            .map_err(|e| WatchError::Join {
                root: self.spec.root.clone(),
                reason: e.to_string(),
            })?;

        summary.flushes += 1;
        summary.changes_applied += stats.applied();

        crate::debug_event!(
            "watcher",
            "flushed",
            "{}: {} upserted, {} deleted, {} restricted, {} failed, {} ignored",
            self.spec.root.display(),
            stats.upserted,
            stats.deleted,
            stats.restricted,
            stats.failed,
            stats.ignored
        );

        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Handle to one root's watch task.
#[derive(Debug)]
pub struct WatchHandle {
    root: PathBuf,
    cancel: CancellationToken,
    join: JoinHandle<Result<WatchSummary, WatchError>>,
}

impl WatchHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True once the task has ended, by cancellation or by error.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel the task and wait for it to end.
    pub async fn stop(self) -> Result<WatchSummary, WatchError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the task to end without cancelling it.
    pub async fn join(self) -> Result<WatchSummary, WatchError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(WatchError::Join {
                root: self.root,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{DocumentBuilder, PlainTextRenderer, SlugSet};
    use crate::storage::{MemoryIndex, Mutation};
    use std::fs;
    use tempfile::TempDir;

    fn spec(root: &Path) -> WatchSpec {
        WatchSpec::new(root, "/w/", ".md", ["private"].into_iter().collect::<SlugSet>())
    }

    fn pipeline(index: Arc<MemoryIndex>) -> SyncPipeline {
        SyncPipeline::new(DocumentBuilder::new(Arc::new(PlainTextRenderer::new())), index)
    }

    /// Poll until `check` holds or the timeout elapses.
    async fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        check()
    }

    #[test]
    fn test_write_then_remove_leaves_key_absent() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.md");
        fs::write(&file, "A\n=\n").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let stats = apply_changes(
            &pipeline(index.clone()),
            &spec(temp_dir.path()),
            &[
                FsChange::new(&file, ChangeKind::Write),
                FsChange::new(&file, ChangeKind::Remove),
            ],
        );

        assert_eq!(stats.upserted, 1);
        assert_eq!(stats.deleted, 1);
        assert!(index.get("/w/a.md").is_none());
        assert_eq!(
            index.log(),
            vec![
                Mutation::Upsert("/w/a.md".to_string()),
                Mutation::Delete("/w/a.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_rename_moves_key() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.md");
        let new = temp_dir.path().join("new.md");
        fs::write(&new, "Moved\n=\n").unwrap();

        let index = Arc::new(MemoryIndex::new());
        apply_changes(
            &pipeline(index.clone()),
            &spec(temp_dir.path()),
            &[
                FsChange::new(&old, ChangeKind::Rename),
                FsChange::new(&new, ChangeKind::Create),
            ],
        );

        assert_eq!(
            index.log(),
            vec![
                Mutation::Delete("/w/old.md".to_string()),
                Mutation::Upsert("/w/new.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_ignored_and_restricted_changes() {
        let temp_dir = TempDir::new().unwrap();
        let secret = temp_dir.path().join("secret.md");
        fs::write(&secret, "topic: private\nS\n=\n").unwrap();
        let text = temp_dir.path().join("notes.txt");
        fs::write(&text, "plain").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let stats = apply_changes(
            &pipeline(index.clone()),
            &spec(temp_dir.path()),
            &[
                FsChange::new(&secret, ChangeKind::Write),
                FsChange::new(&text, ChangeKind::Write),
                FsChange::new(&secret, ChangeKind::Other),
                FsChange::new("/elsewhere/x.md", ChangeKind::Write),
            ],
        );

        assert_eq!(
            stats,
            FlushStats {
                restricted: 1,
                ignored: 3,
                ..FlushStats::default()
            }
        );
        assert!(index.log().is_empty());
    }

    #[tokio::test]
    async fn test_watch_applies_changes_after_window() {
        let temp_dir = TempDir::new().unwrap();
        let index = Arc::new(MemoryIndex::new());

        let handle = RootWatcher::spawn(
            Arc::new(spec(temp_dir.path())),
            Arc::new(pipeline(index.clone())),
            Duration::from_millis(100),
            CancellationToken::new(),
        );

        fs::write(temp_dir.path().join("a.md"), "Watched\n=\nbody\n").unwrap();

        let seen = eventually(Duration::from_secs(10), || index.get("/w/a.md").is_some()).await;
        assert!(seen, "page was never indexed");
        assert_eq!(index.get("/w/a.md").unwrap().title, "Watched");

        fs::remove_file(temp_dir.path().join("a.md")).unwrap();
        let gone = eventually(Duration::from_secs(10), || index.get("/w/a.md").is_none()).await;
        assert!(gone, "page was never removed");

        let summary = handle.stop().await.unwrap();
        assert!(summary.flushes >= 2);
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_changes() {
        let temp_dir = TempDir::new().unwrap();
        let index = Arc::new(MemoryIndex::new());

        let handle = RootWatcher::spawn(
            Arc::new(spec(temp_dir.path())),
            Arc::new(pipeline(index.clone())),
            Duration::from_secs(60),
            CancellationToken::new(),
        );

        fs::write(temp_dir.path().join("a.md"), "Pending\n=\n").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let summary = handle.stop().await.unwrap();
        assert_eq!(summary, WatchSummary::default());
        assert!(index.log().is_empty());
    }

    #[tokio::test]
    async fn test_removed_root_ends_task() {
        let temp_dir = TempDir::new().unwrap();
        let wiki = temp_dir.path().join("wiki");
        fs::create_dir(&wiki).unwrap();
        fs::write(wiki.join("a.md"), "A\n=\n").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let handle = RootWatcher::spawn(
            Arc::new(spec(&wiki)),
            Arc::new(pipeline(index.clone())),
            Duration::from_secs(60),
            CancellationToken::new(),
        );

        fs::remove_dir_all(&wiki).unwrap();

        let finished = eventually(Duration::from_secs(10), || handle.is_finished()).await;
        assert!(finished, "task kept running after its root was removed");
        match handle.join().await {
            Err(WatchError::RootRemoved { root }) => assert_eq!(root, wiki),
            other => panic!("expected root removal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_root_resolves_to_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let handle = RootWatcher::spawn(
            Arc::new(spec(&missing)),
            Arc::new(pipeline(Arc::new(MemoryIndex::new()))),
            Duration::from_millis(100),
            CancellationToken::new(),
        );

        assert_eq!(handle.root(), missing.as_path());
        match handle.join().await {
            Err(WatchError::PathWatchFailed { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected registration failure, got {other:?}"),
        }
    }
}
