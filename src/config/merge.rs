//! Configuration merging utilities
//!
//! This module provides functions to merge configuration from files
//! with command-line arguments, where CLI arguments take precedence.

use super::args::ServerArgs;
use super::defaults::*;
use super::file::ConfigFile;

/// Merge configuration file values with CLI arguments.
/// CLI arguments take precedence over config file values.
/// Only applies config file values where CLI uses defaults.
pub fn merge_config_with_args(mut args: ServerArgs, config: &ConfigFile) -> ServerArgs {
    // Helper macro to apply config value if CLI is at default
    macro_rules! apply_if_default {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(val) = $config_val {
                if args.$field == $default {
                    args.$field = val;
                }
            }
        };
    }

    macro_rules! apply_if_default_string {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref val) = $config_val {
                if args.$field == $default {
                    args.$field = val.clone();
                }
            }
        };
    }

    // Server section
    apply_if_default_string!(http_addr, config.server.http_addr, DEFAULT_HTTP_ADDR);
    apply_if_default_string!(log_level, config.server.log_level, DEFAULT_LOG_LEVEL);
    apply_if_default!(
        shutdown_timeout,
        config.server.shutdown_timeout,
        DEFAULT_SHUTDOWN_TIMEOUT_SECS
    );

    // Storage section
    if let Some(ref path) = config.storage.data_dir {
        if args.data_dir == std::path::Path::new(DEFAULT_DATA_DIR) {
            args.data_dir = path.clone();
        }
    }
    apply_if_default!(in_memory, config.storage.in_memory, DEFAULT_IN_MEMORY);
    apply_if_default!(
        max_body_bytes,
        config.storage.max_body_bytes,
        DEFAULT_MAX_BODY_BYTES
    );

    // Streaming section
    apply_if_default!(
        mailbox_capacity,
        config.streaming.mailbox_capacity,
        DEFAULT_MAILBOX_CAPACITY
    );
    apply_if_default!(
        broadcast_http_writes,
        config.streaming.broadcast_http_writes,
        DEFAULT_BROADCAST_HTTP_WRITES
    );

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(toml: &str) -> ConfigFile {
        ConfigFile::parse(toml).unwrap()
    }

    #[test]
    fn test_file_fills_defaults() {
        let config = file(
            r#"
            [server]
            http_addr = "127.0.0.1:9999"
            [storage]
            data_dir = "/srv/tables"
            in_memory = true
            [streaming]
            mailbox_capacity = 8
            broadcast_http_writes = true
            "#,
        );

        let merged = merge_config_with_args(ServerArgs::default(), &config);
        assert_eq!(merged.http_addr, "127.0.0.1:9999");
        assert_eq!(merged.data_dir, PathBuf::from("/srv/tables"));
        assert!(merged.in_memory);
        assert_eq!(merged.mailbox_capacity, 8);
        assert!(merged.broadcast_http_writes);
        assert_eq!(merged.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_cli_takes_precedence() {
        let config = file(
            r#"
            [server]
            http_addr = "127.0.0.1:9999"
            log_level = "warn"
            [streaming]
            mailbox_capacity = 8
            "#,
        );

        let args = ServerArgs {
            http_addr: "127.0.0.1:7000".to_string(),
            mailbox_capacity: 64,
            ..ServerArgs::default()
        };
        let merged = merge_config_with_args(args, &config);
        assert_eq!(merged.http_addr, "127.0.0.1:7000");
        assert_eq!(merged.mailbox_capacity, 64);
        assert_eq!(merged.log_level, "warn");
    }
}
