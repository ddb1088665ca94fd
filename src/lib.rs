//! Keeps a tantivy full-text index in sync with a tree of Markdown documents.
//!
//! Each configured directory is walked once and then watched; changes are
//! debounced per directory and applied as single-document upserts and
//! deletes keyed by logical URI path.

pub mod cli;
pub mod config;
pub mod documents;
pub mod indexing;
pub mod logging;
pub mod storage;
pub mod types;
pub mod watcher;

pub use config::{IndexSection, LoggingConfig, Settings};
pub use documents::{
    BuildOutcome, DocumentBuilder, IndexedDocument, ParsedFrontMatter, PlainTextRenderer,
    Renderer, SlugSet,
};
pub use indexing::{DirectoryWalker, SyncPipeline, UpdateOutcome, WalkError, WalkStats};
pub use storage::{IndexMutator, MemoryIndex, StorageError, TantivyStore};
pub use types::WatchSpec;
pub use watcher::{EnableReport, SyncError, SyncSupervisor, WatchError};
