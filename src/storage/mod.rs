//! Storage engine for Tablecast
//!
//! The storage engine owns the durable per-table documents. It is layered as:
//!
//! - [`table`]: identity triple and the `{"data": {...}}` document model
//! - [`backend`]: durable `TableId -> bytes` persistence (file or memory)
//! - [`store`]: the [`TableStore`] read-modify-write contract with per-table locking
//! - [`async_io`]: blocking file operations moved off the async workers

pub mod async_io;
pub mod backend;
pub mod store;
pub mod table;

pub use backend::{DocumentBackend, FileBackend, MemoryBackend};
pub use store::TableStore;
pub use table::{validate_name, Document, TableId};
