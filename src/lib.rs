#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Tablecast
//!
//! Tablecast is a small multi-tenant key-value document store. Each table is
//! a flat `key -> value` map persisted as one JSON document, reachable over a
//! REST API and over WebSocket sessions that receive live updates.
//!
//! ## Features
//!
//! - **Tenant isolation**: Basic credentials hash to a private namespace; no
//!   credentials means the shared `default` tenant
//! - **Linearizable tables**: every read-modify-write on a table runs under
//!   that table's lock
//! - **Crash-safe commits**: documents are replaced by write, fsync and rename
//! - **Live updates**: `set` over WebSocket is broadcast to every session on
//!   the same table, in commit order
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with defaults (listens on 0.0.0.0:8080, data in ./data)
//! $ ./tablecast
//!
//! # Write and read a value
//! $ curl -X POST --data '1.50' http://localhost:8080/api/shop/prices/apple
//! SET: apple
//! $ curl http://localhost:8080/api/shop/prices/apple
//! 1.50
//!
//! # Open a live session
//! $ websocat ws://localhost:8080/ws/shop/prices
//! TENANT: default
//! set color red
//! UPDATE: color: red
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use tablecast::{Result, TableId, TableStore, TenantId};
//!
//! # async fn example() -> Result<()> {
//! let store = TableStore::open("./data").await?;
//! let table = TableId::new(TenantId::default_tenant(), "shop", "prices")?;
//!
//! store.set_key(&table, "apple", "1.50").await?;
//! assert_eq!(store.get_key(&table, "apple").await?.as_deref(), Some("1.50"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`tenant`]: credential to tenant resolution
//! - [`storage`]: table identity, documents, backends and the [`TableStore`]
//! - [`pubsub`]: the [`SubscriptionHub`] of live sessions per table
//! - [`protocol`]: the text command protocol spoken by sessions
//! - [`server`]: HTTP, WebSocket and health endpoints
//! - [`config`]: CLI, environment and TOML configuration

#![cfg_attr(not(test), deny(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod protocol;
pub mod pubsub;
pub mod server;
pub mod storage;
pub mod tenant;

pub use config::{ServerArgs, ServerConfig};
pub use error::{ErrorHint, Result, StorageError, TablecastError};
pub use protocol::{Command, CommandSession, Outcome};
pub use pubsub::{HubConfig, HubStats, Mailbox, Subscriber, SubscriptionHub};
pub use server::Server;
pub use storage::{Document, DocumentBackend, FileBackend, MemoryBackend, TableId, TableStore};
pub use tenant::{Credentials, TenantId};
