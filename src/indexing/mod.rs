pub mod sync;
pub mod walker;

pub use sync::{SyncPipeline, UpdateOutcome};
pub use walker::{DirectoryWalker, WalkError, WalkStats};
