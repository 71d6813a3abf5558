//! Domain-specific error types for Tablecast

use thiserror::Error;

/// Structured storage error domain
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("{operation}: {detail}")]
    Operation { operation: String, detail: String },
    #[error("{table}: {operation}: {detail}")]
    Table {
        table: String,
        operation: String,
        detail: String,
    },
    /// The persisted representation of a table could not be decoded
    #[error("{table}: corrupted document: {detail}")]
    Corrupted { table: String, detail: String },
    #[error("{0}")]
    Message(String),
}

impl StorageError {
    pub fn operation(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn table(
        table: impl Into<String>,
        operation: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Table {
            table: table.into(),
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn corrupted(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Corrupted {
            table: table.into(),
            detail: detail.into(),
        }
    }
}

/// Structured server error domain
#[derive(Debug, Error, Clone)]
pub enum ServerError {
    #[error("failed to bind {address}: {reason}")]
    BindFailed { address: String, reason: String },
    #[error("shutdown: {0}")]
    Shutdown(String),
}

impl ServerError {
    pub fn bind_failed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub fn shutdown(detail: impl Into<String>) -> Self {
        Self::Shutdown(detail.into())
    }
}
