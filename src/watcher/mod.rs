//! Per-root file watching that keeps indexes in sync.
//!
//! # Architecture
//!
//! ```text
//! SyncSupervisor
//!   - one WatchHandle per watched root
//!         |
//!    RootWatcher task (one per root)
//!      - notify::RecommendedWatcher, recursive
//!      - EventBatch: arrival-ordered, idle-window flush
//!      - flush on the blocking pool -> SyncPipeline
//! ```

mod debouncer;
mod error;
mod event;
mod root;
mod supervisor;

pub use debouncer::EventBatch;
pub use error::WatchError;
pub use event::{ChangeKind, FsChange};
pub use root::{
    DEFAULT_DEBOUNCE_MS, FlushStats, RootWatcher, WatchHandle, WatchSummary, apply_changes,
};
pub use supervisor::{EnableReport, SyncError, SyncSupervisor};
