//! Configuration for the Tablecast server
//!
//! Values come from, in decreasing priority: command-line flags, `TABLECAST_*`
//! environment variables, a TOML file, and the constants in [`defaults`].
//! [`ServerArgs`] carries the first two (clap handles both), [`ConfigFile`]
//! the third, and [`merge_config_with_args`] folds the file into the args.
//! [`ServerConfig::from_args`] then produces the typed configuration the
//! server runs with.

pub mod args;
pub mod defaults;
pub mod file;
pub mod merge;

pub use args::ServerArgs;
pub use defaults::*;
pub use file::ConfigFile;
pub use merge::merge_config_with_args;

use crate::error::{Result, TablecastError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for table documents
    pub data_dir: PathBuf,

    /// Keep documents in memory only
    pub in_memory: bool,

    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            in_memory: DEFAULT_IN_MEMORY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Streaming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Per-subscriber mailbox capacity
    pub mailbox_capacity: usize,

    /// Broadcast REST writes to streaming subscribers
    pub broadcast_http_writes: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            broadcast_http_writes: DEFAULT_BROADCAST_HTTP_WRITES,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on for HTTP and WebSocket
    pub http_addr: SocketAddr,

    /// Log level
    pub log_level: String,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Streaming configuration
    pub streaming: StreamingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_SOCKET_ADDR,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            storage: StorageConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration from command-line arguments
    pub fn from_args(args: ServerArgs) -> Result<Self> {
        let http_addr: SocketAddr = args
            .http_addr
            .parse()
            .map_err(|e| TablecastError::Config(format!("Invalid HTTP address: {}", e)))?;

        Ok(Self {
            http_addr,
            log_level: args.log_level,
            shutdown_timeout_secs: args.shutdown_timeout,
            storage: StorageConfig {
                data_dir: args.data_dir,
                in_memory: args.in_memory,
                max_body_bytes: args.max_body_bytes,
            },
            streaming: StreamingConfig {
                mailbox_capacity: args.mailbox_capacity,
                broadcast_http_writes: args.broadcast_http_writes,
            },
        })
    }

    /// Configuration for an in-memory server, used by tests and demos
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.storage.in_memory = true;
        config
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.http_addr.port() == 0 {
            return Err(TablecastError::Config(
                "HTTP listen port must be between 1 and 65535".to_string(),
            ));
        }

        if self.streaming.mailbox_capacity == 0 {
            return Err(TablecastError::Config(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }

        if self.storage.max_body_bytes == 0 {
            return Err(TablecastError::Config(
                "max_body_bytes must be at least 1".to_string(),
            ));
        }

        if !self.storage.in_memory && self.storage.data_dir.as_os_str().is_empty() {
            return Err(TablecastError::Config(
                "data_dir must not be empty unless in_memory is set".to_string(),
            ));
        }

        Ok(())
    }
}
