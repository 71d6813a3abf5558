//! Tablecast server
//!
//! [`Server`] owns the table store and the subscription hub and serves both
//! over one HTTP listener:
//!
//! - [`api`]: REST access to tables
//! - [`websocket`]: streaming command sessions
//! - [`http`]: router composition, health and serving

pub mod api;
pub mod http;
pub mod shutdown;
pub mod websocket;

pub use http::{build_router, HttpServerState};
pub use shutdown::shutdown_signal;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::pubsub::{HubConfig, SubscriptionHub};
use crate::storage::TableStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The Tablecast server
pub struct Server {
    config: ServerConfig,
    store: Arc<TableStore>,
    hub: Arc<SubscriptionHub>,
}

impl Server {
    /// Create a server, opening the configured storage backend
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let store = if config.storage.in_memory {
            info!("Using in-memory storage, documents will not persist");
            TableStore::in_memory()
        } else {
            info!(data_dir = %config.storage.data_dir.display(), "Using file storage");
            TableStore::open(&config.storage.data_dir).await?
        };

        let hub = SubscriptionHub::with_config(HubConfig {
            mailbox_capacity: config.streaming.mailbox_capacity,
        });

        Ok(Self {
            config,
            store: Arc::new(store),
            hub: Arc::new(hub),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<TableStore> {
        self.store.clone()
    }

    pub fn hub(&self) -> Arc<SubscriptionHub> {
        self.hub.clone()
    }

    /// State shared by the HTTP handlers
    pub fn http_state(&self) -> HttpServerState {
        HttpServerState {
            store: self.store.clone(),
            hub: self.hub.clone(),
            broadcast_http_writes: self.config.streaming.broadcast_http_writes,
            max_body_bytes: self.config.storage.max_body_bytes,
        }
    }

    /// Run until Ctrl-C or SIGTERM
    pub async fn run(&self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Bind the configured address and run until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            http_addr = %self.config.http_addr,
            backend = self.store.backend_name(),
            broadcast_http_writes = self.config.streaming.broadcast_http_writes,
            "Starting Tablecast server"
        );
        http::start_http_server(
            self.config.http_addr,
            self.http_state(),
            shutdown,
            self.config.shutdown_timeout(),
        )
        .await
    }

    /// Run on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        http::serve(
            listener,
            self.http_state(),
            shutdown,
            self.config.shutdown_timeout(),
        )
        .await
    }
}
