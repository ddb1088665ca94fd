use std::path::PathBuf;

use tantivy::TantivyError;
use tantivy::directory::error::OpenDirectoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("Directory error: {0}")]
    Directory(#[from] OpenDirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index not found at {0}")]
    NotFound(PathBuf),

    #[error("Index at {path} has no '{field}' field")]
    MissingField { path: PathBuf, field: String },

    #[error("Unknown analyzer '{0}' (expected one of: default, raw, en_stem, whitespace)")]
    UnknownAnalyzer(String),

    #[error("Index writer at {path} still locked after {attempts} attempts")]
    LockTimeout { path: PathBuf, attempts: u32 },
}

pub type StorageResult<T> = Result<T, StorageError>;
