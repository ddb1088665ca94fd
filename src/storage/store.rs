//! Page storage in a tantivy index.
//!
//! Every mutation opens the index, applies one upsert or delete, commits and
//! closes again. There is no session shared between calls, so a failed call
//! never leaves a writer behind for the next one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::directory::error::LockError;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::TokenizerManager;
use tantivy::{
    DateTime, Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy,
    TantivyDocument as Document, TantivyError, Term,
};

use super::error::{StorageError, StorageResult};
use super::schema::PageSchema;
use crate::documents::IndexedDocument;

/// Writer heap for single-document mutations.
const WRITER_HEAP_BYTES: usize = 20_000_000;

/// How often to retry when another task holds the index writer lock.
const LOCK_RETRY_ATTEMPTS: u32 = 100;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Applies single-page mutations to an index, keyed by URI path.
pub trait IndexMutator: Send + Sync {
    /// Write or overwrite the record stored under `doc.uri_path`.
    fn upsert(&self, doc: &IndexedDocument) -> StorageResult<()>;

    /// Remove the record stored under `uri_path`. Absence is not an error.
    fn delete(&self, uri_path: &str) -> StorageResult<()>;
}

/// A tantivy index on disk, addressed by its directory.
#[derive(Debug, Clone)]
pub struct TantivyStore {
    path: PathBuf,
}

impl TantivyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Open the index at `path`, creating it with the page schema if absent.
    ///
    /// An existing index is reused as long as it carries every page field.
    pub fn ensure(path: impl AsRef<Path>, name: &str, analyzer: &str) -> StorageResult<Self> {
        let store = Self::new(path);
        if store.exists() {
            tracing::info!(target: "storage", "index '{name}' already exists at {}", store.path.display());
            store.open()?.close()?;
        } else {
            tracing::info!(target: "storage", "creating index '{name}' at {}", store.path.display());
            store.create(analyzer)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an index has been created at this path.
    pub fn exists(&self) -> bool {
        self.path.join("meta.json").exists()
    }

    /// Create a new, empty index.
    pub fn create(&self, analyzer: &str) -> StorageResult<()> {
        if TokenizerManager::default().get(analyzer).is_none() {
            return Err(StorageError::UnknownAnalyzer(analyzer.to_string()));
        }

        std::fs::create_dir_all(&self.path)?;
        let (schema, _) = PageSchema::build(analyzer);
        let dir = MmapDirectory::open(&self.path)?;
        Index::create(dir, schema, IndexSettings::default())?;
        Ok(())
    }

    /// Open a handle on the existing index.
    pub fn open(&self) -> StorageResult<IndexHandle> {
        if !self.exists() {
            return Err(StorageError::NotFound(self.path.clone()));
        }

        let index = Index::open_in_dir(&self.path)?;
        let schema = PageSchema::from_schema(&index.schema()).map_err(|field| {
            StorageError::MissingField {
                path: self.path.clone(),
                field: field.to_string(),
            }
        })?;

        Ok(IndexHandle {
            index,
            schema,
            path: self.path.clone(),
            writer: None,
        })
    }

    /// Look up the record stored under `uri_path`.
    pub fn get(&self, uri_path: &str) -> StorageResult<Option<IndexedDocument>> {
        self.open()?.get(uri_path)
    }

    /// Number of records in the index.
    pub fn num_docs(&self) -> StorageResult<u64> {
        self.open()?.num_docs()
    }
}

impl IndexMutator for TantivyStore {
    fn upsert(&self, doc: &IndexedDocument) -> StorageResult<()> {
        let mut handle = self.open()?;
        handle.upsert(doc)?;
        handle.close()
    }

    fn delete(&self, uri_path: &str) -> StorageResult<()> {
        let mut handle = self.open()?;
        handle.delete(uri_path)?;
        handle.close()
    }
}

/// An open index. Mutations are buffered until `close`.
pub struct IndexHandle {
    index: Index,
    schema: PageSchema,
    path: PathBuf,
    writer: Option<IndexWriter<Document>>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("path", &self.path)
            .field("has_writer", &self.writer.is_some())
            .finish()
    }
}

impl IndexHandle {
    /// Replace whatever is stored under the document's key.
    pub fn upsert(&mut self, doc: &IndexedDocument) -> StorageResult<()> {
        let record = self.page_to_record(doc);
        let key = self.key(&doc.uri_path);
        let writer = self.ensure_writer()?;
        writer.delete_term(key);
        writer.add_document(record)?;
        Ok(())
    }

    pub fn delete(&mut self, uri_path: &str) -> StorageResult<()> {
        let key = self.key(uri_path);
        self.ensure_writer()?.delete_term(key);
        Ok(())
    }

    /// Commit buffered mutations and release the writer lock.
    pub fn close(self) -> StorageResult<()> {
        if let Some(mut writer) = self.writer {
            writer.commit()?;
            writer.wait_merging_threads()?;
        }
        Ok(())
    }

    pub fn get(&self, uri_path: &str) -> StorageResult<Option<IndexedDocument>> {
        let searcher = self.reader()?.searcher();
        let query = TermQuery::new(self.key(uri_path), IndexRecordOption::Basic);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;

        let Some((_, address)) = top_docs.into_iter().next() else {
            return Ok(None);
        };
        let doc: Document = searcher.doc(address)?;
        Ok(Some(self.record_to_page(&doc)))
    }

    pub fn num_docs(&self) -> StorageResult<u64> {
        Ok(self.reader()?.searcher().num_docs())
    }

    fn key(&self, uri_path: &str) -> Term {
        Term::from_field_text(self.schema.path, uri_path)
    }

    fn reader(&self) -> StorageResult<IndexReader> {
        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader)
    }

    /// Create the writer on first use, waiting out other writers.
    fn ensure_writer(&mut self) -> StorageResult<&mut IndexWriter<Document>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.acquire_writer()?,
        };
        Ok(self.writer.insert(writer))
    }

    fn acquire_writer(&self) -> StorageResult<IndexWriter<Document>> {
        for attempt in 1..=LOCK_RETRY_ATTEMPTS {
            match self.index.writer_with_num_threads(1, WRITER_HEAP_BYTES) {
                Ok(writer) => return Ok(writer),
                Err(TantivyError::LockFailure(LockError::LockBusy, _)) => {
                    tracing::debug!(
                        target: "storage",
                        "writer lock busy at {} (attempt {attempt})",
                        self.path.display()
                    );
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::LockTimeout {
            path: self.path.clone(),
            attempts: LOCK_RETRY_ATTEMPTS,
        })
    }

    fn page_to_record(&self, doc: &IndexedDocument) -> Document {
        let mut record = Document::new();
        record.add_text(self.schema.path, &doc.uri_path);
        record.add_text(self.schema.title, &doc.title);
        record.add_text(self.schema.body, &doc.body);
        record.add_text(self.schema.topic, &doc.topics);
        record.add_text(self.schema.keyword, &doc.keywords);
        record.add_text(self.schema.author, &doc.authors);
        record.add_date(
            self.schema.modified,
            DateTime::from_timestamp_secs(doc.modified),
        );
        record
    }

    fn record_to_page(&self, record: &Document) -> IndexedDocument {
        let text = |field| {
            record
                .get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        IndexedDocument {
            uri_path: text(self.schema.path),
            title: text(self.schema.title),
            body: text(self.schema.body),
            topics: text(self.schema.topic),
            keywords: text(self.schema.keyword),
            authors: text(self.schema.author),
            modified: record
                .get_first(self.schema.modified)
                .and_then(|v| v.as_datetime())
                .map(|dt| dt.into_timestamp_secs())
                .unwrap_or(0),
        }
    }
}
