//! Per-table document store
//!
//! Every operation is a self-contained load -> (mutate -> commit) cycle run
//! under a mutual-exclusion scope keyed by [`TableId`]. Operations on the
//! same table are therefore linearizable, while operations on different
//! tables only share the lock map and proceed independently.
//!
//! ## Materialization
//!
//! A table with no persisted record is an empty document. The first
//! operation to touch it commits that empty document, so after any
//! successful call the record exists in the backend.
//!
//! ## Commit hooks
//!
//! `set_key_then` / `delete_key_then` run a callback after the commit while
//! the table lock is still held. Broadcasting from the hook makes the
//! per-table notification order identical to the commit order.
//!
//! ## Cancellation
//!
//! A cycle that has acquired its table lock runs to completion on its own
//! task, commit hook included, even if the calling future is dropped.

use crate::error::{Result, TablecastError};
use crate::storage::backend::{DocumentBackend, FileBackend, MemoryBackend};
use crate::storage::table::{Document, TableId};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Durable store of per-table documents
#[derive(Debug)]
pub struct TableStore {
    backend: Arc<dyn DocumentBackend>,
    /// One lock per table ever touched. Tables are never destroyed, so
    /// entries are never removed.
    locks: DashMap<TableId, Arc<Mutex<()>>>,
}

impl TableStore {
    /// Create a store over an arbitrary backend
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        info!(backend = backend.name(), "Table store initialized");
        Self {
            backend,
            locks: DashMap::new(),
        }
    }

    /// Create a file-backed store rooted at `data_dir`
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let backend = FileBackend::open(data_dir).await?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Create a store that keeps documents in memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of distinct tables touched since startup
    pub fn tracked_tables(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, id: &TableId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().value().clone()
    }

    /// Return the full current document
    pub async fn get_all(&self, id: &TableId) -> Result<Document> {
        self.run_locked(id, "get_all", |doc| (false, doc.clone()), || {})
            .await
    }

    /// Return the value for `key`, or `None` if absent
    pub async fn get_key(&self, id: &TableId, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.run_locked(id, "get", move |doc| (false, doc.get(&key).cloned()), || {})
            .await
    }

    /// Upsert `key -> value`
    pub async fn set_key(&self, id: &TableId, key: &str, value: &str) -> Result<()> {
        self.set_key_then(id, key, value, || {}).await
    }

    /// Upsert `key -> value`, then run `on_commit` before releasing the table lock
    pub async fn set_key_then<F>(&self, id: &TableId, key: &str, value: &str, on_commit: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.to_string();
        let value = value.to_string();
        self.run_locked(
            id,
            "set",
            move |doc| {
                doc.set(key, value);
                (true, ())
            },
            on_commit,
        )
        .await
    }

    /// Remove `key`. Absent keys are a successful no-op.
    pub async fn delete_key(&self, id: &TableId, key: &str) -> Result<bool> {
        self.delete_key_then(id, key, || {}).await
    }

    /// Remove `key`, running `on_commit` under the table lock if it was present.
    ///
    /// Returns whether the key existed.
    pub async fn delete_key_then<F>(&self, id: &TableId, key: &str, on_commit: F) -> Result<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.to_string();
        self.run_locked(
            id,
            "delete",
            move |doc| {
                let removed = doc.remove(&key);
                (removed, removed)
            },
            on_commit,
        )
        .await
    }

    /// Run one load -> apply -> commit cycle under the table lock.
    ///
    /// `apply` returns whether it changed the document along with the
    /// operation's output; unchanged documents are not rewritten and
    /// `on_commit` is skipped.
    ///
    /// Once the lock is acquired the cycle runs on its own task holding an
    /// owned guard, so dropping the caller's future cannot release the lock
    /// while a commit is still in flight.
    async fn run_locked<T, A, F>(
        &self,
        id: &TableId,
        operation: &'static str,
        apply: A,
        on_commit: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        A: FnOnce(&mut Document) -> (bool, T) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let guard = self.lock_for(id).lock_owned().await;
        let backend = self.backend.clone();
        let table = id.clone();

        let cycle: JoinHandle<Result<T>> = tokio::spawn(async move {
            let _guard = guard;

            let mut doc = load_locked(backend.as_ref(), &table).await?;
            let (changed, output) = apply(&mut doc);
            if !changed {
                return Ok(output);
            }

            let bytes = doc.encode()?;
            if let Err(e) = backend.commit(&table, bytes).await {
                error!(table = %table, operation, error = %e, "Commit failed");
                return Err(e);
            }
            debug!(table = %table, operation, keys = doc.len(), "Committed document");

            on_commit();
            Ok(output)
        });

        cycle.await.map_err(|e| {
            TablecastError::storage_table(
                &id.to_string(),
                operation,
                format!("task join error: {}", e),
            )
        })?
    }
}

/// Load a document, committing an empty one if the table has never been
/// persisted. Caller must hold the table lock.
async fn load_locked(backend: &dyn DocumentBackend, id: &TableId) -> Result<Document> {
    let table = id.to_string();
    match backend.load(id).await? {
        Some(bytes) => Document::decode(&bytes, &table),
        None => {
            let doc = Document::new();
            backend.commit(id, doc.encode()?).await?;
            debug!(table = %table, "Materialized empty table");
            Ok(doc)
        }
    }
}
