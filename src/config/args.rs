//! Command-line arguments for the Tablecast server
//!
//! This module defines the CLI arguments structure using clap.

use clap::Parser;
use std::path::PathBuf;

use super::defaults::*;

/// Command-line arguments for the Tablecast server
#[derive(Parser, Debug, Clone)]
#[command(name = "tablecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-tenant key-value tables over HTTP with live WebSocket updates")]
pub struct ServerArgs {
    /// Path to configuration file (TOML format)
    /// If not specified, looks for tablecast.toml in current directory,
    /// /etc/tablecast/, or ~/.config/tablecast/
    #[arg(short, long, env = "TABLECAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Address to listen on for HTTP and WebSocket
    #[arg(long, env = "TABLECAST_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: String,

    /// Data directory for table documents
    #[arg(long, env = "TABLECAST_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TABLECAST_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, env = "TABLECAST_SHUTDOWN_TIMEOUT", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout: u64,

    /// Keep documents in memory only. Nothing survives a restart.
    #[arg(long, env = "TABLECAST_IN_MEMORY", default_value_t = DEFAULT_IN_MEMORY)]
    pub in_memory: bool,

    /// Maximum request body size in bytes
    #[arg(long, env = "TABLECAST_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Messages a streaming subscriber may have queued before it is evicted
    #[arg(long, env = "TABLECAST_MAILBOX_CAPACITY", default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    pub mailbox_capacity: usize,

    /// Also broadcast REST `POST` writes to streaming subscribers
    #[arg(long, env = "TABLECAST_BROADCAST_HTTP_WRITES", default_value_t = DEFAULT_BROADCAST_HTTP_WRITES)]
    pub broadcast_http_writes: bool,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            config: None,
            generate_config: false,
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            in_memory: DEFAULT_IN_MEMORY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            broadcast_http_writes: DEFAULT_BROADCAST_HTTP_WRITES,
        }
    }
}
