//! Default constants for Tablecast configuration
//!
//! These constants define the default values used throughout the configuration
//! system when no explicit value is provided.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default listen address for the HTTP and WebSocket API
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default HTTP socket address (const, no parsing needed)
pub(crate) const DEFAULT_HTTP_SOCKET_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 8080);

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default graceful shutdown timeout in seconds
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default in-memory storage mode
pub const DEFAULT_IN_MEMORY: bool = false;

/// Default maximum request body size in bytes (1 MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default subscriber mailbox capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = crate::pubsub::DEFAULT_MAILBOX_CAPACITY;

/// Default for broadcasting REST writes to streaming subscribers
pub const DEFAULT_BROADCAST_HTTP_WRITES: bool = false;
