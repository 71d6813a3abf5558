//! Configuration file support for Tablecast
//!
//! This module provides TOML configuration file parsing.
//!
//! ## Priority Order
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! ## Example Configuration
//!
//! ```toml
//! # tablecast.toml
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! log_level = "info"
//!
//! [storage]
//! data_dir = "/var/lib/tablecast"
//! in_memory = false
//!
//! [streaming]
//! mailbox_capacity = 1024
//! broadcast_http_writes = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TablecastError};

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerSection,

    /// Storage configuration
    pub storage: StorageSection,

    /// Streaming configuration
    pub streaming: StreamingSection,
}

/// Server section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP and WebSocket listen address
    pub http_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: Option<u64>,
}

/// Storage section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Data directory path
    pub data_dir: Option<PathBuf>,

    /// Keep documents in memory only
    pub in_memory: Option<bool>,

    /// Maximum request body size in bytes
    pub max_body_bytes: Option<usize>,
}

/// Streaming section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSection {
    /// Per-subscriber mailbox capacity
    pub mailbox_capacity: Option<usize>,

    /// Broadcast REST writes to streaming subscribers
    pub broadcast_http_writes: Option<bool>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TablecastError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
            .map_err(|e| TablecastError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Try to load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./tablecast.toml
    /// 2. /etc/tablecast/tablecast.toml
    /// 3. ~/.config/tablecast/tablecast.toml
    pub fn load_default() -> Option<Self> {
        let default_paths = [
            PathBuf::from("tablecast.toml"),
            PathBuf::from("/etc/tablecast/tablecast.toml"),
            dirs::config_dir()
                .map(|p| p.join("tablecast/tablecast.toml"))
                .unwrap_or_default(),
        ];

        for path in default_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        None
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# Tablecast Configuration File
# Copy to tablecast.toml and customize as needed
#
# Configuration priority (highest to lowest):
# 1. Command-line arguments
# 2. Environment variables (TABLECAST_*)
# 3. This configuration file
# 4. Default values

[server]
# HTTP and WebSocket listen address
http_addr = "0.0.0.0:8080"

# Log level (trace, debug, info, warn, error)
log_level = "info"

# Graceful shutdown timeout in seconds
shutdown_timeout = 30

[storage]
# One JSON document per table at <data_dir>/<tenant>/<object>/<table>.json
data_dir = "./data"

# Keep documents in memory only (nothing survives a restart)
in_memory = false

# Maximum request body size in bytes (default: 1MB)
max_body_bytes = 1048576

[streaming]
# Messages a subscriber may have queued before it is evicted
mailbox_capacity = 1024

# Also broadcast REST POST writes to WebSocket subscribers.
# By default only writes made over WebSocket are broadcast.
broadcast_http_writes = false
"#
        .to_string()
    }
}
