//! Actionable hints attached to error responses

use super::{StorageError, TablecastError};

/// Extension trait for adding hints to errors
pub trait ErrorHint {
    /// Get a helpful hint for resolving this error
    fn hint(&self) -> Option<String>;

    /// Format the error with hint for display
    fn with_hint(&self) -> String;
}

impl ErrorHint for TablecastError {
    fn hint(&self) -> Option<String> {
        match self {
            TablecastError::InvalidName(name) => Some(format!(
                "Name '{}' is invalid. Object and table names must be 1-255 characters using alphanumeric, '.', '_', or '-', and cannot be '.' or '..'",
                name
            )),
            TablecastError::InvalidCredentials(_) => Some(
                "Send credentials as `Authorization: Basic base64(user:secret)` or omit the header to use the default tenant".into(),
            ),
            TablecastError::StorageDomain(StorageError::Corrupted { table, .. }) => Some(format!(
                "The persisted document for '{}' is not valid JSON of the form {{\"data\": {{...}}}}. Restore it from a backup or remove the file",
                table
            )),
            TablecastError::Io(_) | TablecastError::StorageDomain(_) => Some(
                "Storage error. Check free space and permissions on the data directory".into(),
            ),
            TablecastError::Config(_) => Some(
                "Configuration error. Generate a reference config with: `tablecast --generate-config > tablecast.toml`".into(),
            ),
            TablecastError::ServerDomain(_) => Some(
                "Server error. Use --http-addr to pick a different address if the port is taken".into(),
            ),
            TablecastError::Serialization(_) => None,
        }
    }

    fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
