//! In-memory page index.
//!
//! Implements `IndexMutator` without touching disk. `docsync index --dry-run`
//! walks into it, and tests use its mutation log to check ordering.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::error::StorageResult;
use super::store::IndexMutator;
use crate::documents::IndexedDocument;

/// One mutation as it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Upsert(String),
    Delete(String),
}

/// Pages keyed by URI path, plus the ordered mutation log.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    pages: BTreeMap<String, IndexedDocument>,
    log: Vec<Mutation>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri_path: &str) -> Option<IndexedDocument> {
        self.lock().pages.get(uri_path).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutations in the order they were applied.
    pub fn log(&self) -> Vec<Mutation> {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IndexMutator for MemoryIndex {
    fn upsert(&self, doc: &IndexedDocument) -> StorageResult<()> {
        let mut state = self.lock();
        state.log.push(Mutation::Upsert(doc.uri_path.clone()));
        state.pages.insert(doc.uri_path.clone(), doc.clone());
        Ok(())
    }

    fn delete(&self, uri_path: &str) -> StorageResult<()> {
        let mut state = self.lock();
        state.log.push(Mutation::Delete(uri_path.to_string()));
        state.pages.remove(uri_path);
        Ok(())
    }
}
