//! Error types for Tablecast
//!
//! This module defines the error taxonomy used throughout the crate. A
//! missing table or key is never an error: those surface as empty results.
//! Storage failures, malformed names and malformed credentials are.

use thiserror::Error;

mod domain;
mod hints;

pub use domain::{ServerError, StorageError};
pub use hints::ErrorHint;

/// Result type alias for Tablecast operations
pub type Result<T> = std::result::Result<T, TablecastError>;

/// Main error type for Tablecast
#[derive(Error, Debug)]
pub enum TablecastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    StorageDomain(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Server error: {0}")]
    ServerDomain(#[from] ServerError),
}

impl TablecastError {
    /// Create a storage error from a message string (routes through StorageDomain)
    pub fn storage_msg(msg: String) -> Self {
        TablecastError::StorageDomain(StorageError::Message(msg))
    }

    /// Create a storage error with operation context
    ///
    /// # Example
    /// ```ignore
    /// TablecastError::storage("open", "permission denied")
    /// // produces: "Storage error: open: permission denied"
    /// ```
    pub fn storage(operation: &str, detail: impl Into<String>) -> Self {
        TablecastError::StorageDomain(StorageError::operation(operation, detail))
    }

    /// Create a storage error for a specific table
    pub fn storage_table(table: &str, operation: &str, detail: impl Into<String>) -> Self {
        TablecastError::StorageDomain(StorageError::table(table, operation, detail))
    }

    /// Create a storage error for a document that failed to decode
    pub fn corrupted(table: &str, detail: impl Into<String>) -> Self {
        TablecastError::StorageDomain(StorageError::corrupted(table, detail))
    }

    /// Create a server error for bind failures
    pub fn server_bind_failed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        TablecastError::ServerDomain(ServerError::bind_failed(address, reason))
    }

    /// Create a server error for shutdown failures
    pub fn server_shutdown(detail: impl Into<String>) -> Self {
        TablecastError::ServerDomain(ServerError::shutdown(detail))
    }

    /// Whether this error originated in the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            TablecastError::Io(_) | TablecastError::StorageDomain(_) | TablecastError::Serialization(_)
        )
    }

    /// Whether this error was caused by bad client input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TablecastError::InvalidName(_) | TablecastError::InvalidCredentials(_)
        )
    }
}
