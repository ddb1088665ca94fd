//! Error types for per-root watch tasks.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a root's watch task. Never fatal for other roots.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watch on {root} failed: {details}")]
    Transport { root: PathBuf, details: String },

    #[error("Watched directory {root} was removed")]
    RootRemoved { root: PathBuf },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    #[error("Watch task for {root} did not finish: {reason}")]
    Join { root: PathBuf, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
