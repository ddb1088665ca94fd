//! Page index storage.
//!
//! `TantivyStore` is the on-disk index; `MemoryIndex` records mutations
//! without persisting them.

pub mod error;
pub mod memory;
pub mod schema;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryIndex, Mutation};
pub use schema::PageSchema;
pub use store::{IndexHandle, IndexMutator, TantivyStore};
