//! Table identity and document model
//!
//! A [`TableId`] is the `(tenant, object, table)` triple that addresses one
//! [`Document`]. Its display form, `tenant/object/table`, doubles as the
//! endpoint string streaming subscribers are grouped under and as the
//! relative path of the persisted record.

use crate::error::{Result, TablecastError};
use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of an object or table name
pub const MAX_NAME_LEN: usize = 255;

/// Validate an object or table name.
///
/// Names end up as path components, so they are restricted to
/// `[A-Za-z0-9._-]`, 1-255 characters, and may not be `.` or `..`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(TablecastError::InvalidName(name.to_string()))
    }
}

/// Composite identity of one table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    tenant: TenantId,
    object: String,
    table: String,
}

impl TableId {
    /// Build an identity, validating `object` and `table`.
    pub fn new(tenant: TenantId, object: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let object = object.into();
        let table = table.into();
        validate_name(&object)?;
        validate_name(&table)?;
        Ok(Self {
            tenant,
            object,
            table,
        })
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Endpoint string used to group streaming subscribers
    pub fn endpoint(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.object, self.table)
    }
}

/// Full key-value contents of one table.
///
/// Serialized as `{"data": {key: value, ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode a persisted document. `table` is only used for error context.
    pub fn decode(bytes: &[u8], table: &str) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| TablecastError::corrupted(table, e.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
