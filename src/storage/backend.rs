//! Persistence backends for table documents
//!
//! The store only needs durable `TableId -> bytes` storage with whole-record
//! replace semantics. Two implementations are provided:
//!
//! - [`FileBackend`]: one JSON file per table at
//!   `<data_dir>/<tenant>/<object>/<table>.json`, replaced atomically
//! - [`MemoryBackend`]: process-local map for tests and ephemeral runs

use crate::error::Result;
use crate::storage::async_io::{atomic_write_async, create_dir_all_async, read_optional_async};
use crate::storage::table::TableId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::debug;

/// Durable key -> bytes storage keyed by table identity
///
/// Implementations do not need their own locking per table: the
/// [`TableStore`](crate::storage::TableStore) never issues two calls for
/// the same identity concurrently.
#[async_trait]
pub trait DocumentBackend: Send + Sync + Debug {
    /// Load the persisted bytes for a table, `None` if it was never committed.
    async fn load(&self, id: &TableId) -> Result<Option<Vec<u8>>>;

    /// Durably replace the persisted bytes for a table.
    ///
    /// Must not return `Ok` before a subsequent `load` (including one after
    /// a restart, for durable backends) observes `bytes`.
    async fn commit(&self, id: &TableId, bytes: Vec<u8>) -> Result<()>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// File-per-table backend
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        create_dir_all_async(root.clone()).await?;
        debug!(root = %root.display(), "File backend opened");
        Ok(Self { root })
    }

    /// Path of the persisted record for `id`.
    ///
    /// Object and table names are validated at `TableId` construction and the
    /// tenant is either a hex digest or the default marker, so every component
    /// is a plain file name.
    pub fn document_path(&self, id: &TableId) -> PathBuf {
        self.root
            .join(id.tenant().as_str())
            .join(id.object())
            .join(format!("{}.json", id.table()))
    }
}

#[async_trait]
impl DocumentBackend for FileBackend {
    async fn load(&self, id: &TableId) -> Result<Option<Vec<u8>>> {
        read_optional_async(self.document_path(id)).await
    }

    async fn commit(&self, id: &TableId, bytes: Vec<u8>) -> Result<()> {
        let path = self.document_path(id);
        atomic_write_async(path, bytes).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: DashMap<TableId, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tables that have been committed
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Overwrite the raw record for a table, bypassing the store.
    pub fn put_raw(&self, id: &TableId, bytes: Vec<u8>) {
        self.records.insert(id.clone(), bytes);
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn load(&self, id: &TableId) -> Result<Option<Vec<u8>>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn commit(&self, id: &TableId, bytes: Vec<u8>) -> Result<()> {
        self.records.insert(id.clone(), bytes);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
