//! Credential to tenant resolution
//!
//! `resolve` is deterministic and infallible. `resolve_header` adds the
//! parsing of an HTTP `Authorization: Basic ...` header in front of it; a
//! missing header resolves to the default tenant, a present but unreadable
//! one is rejected so that a typo never silently lands in the shared tenant.

use super::types::{Credentials, TenantId};
use crate::error::{Result, TablecastError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

/// Derive the tenant for an optional set of credentials.
///
/// The digest covers the length of `user` ahead of the concatenated
/// `user` and `secret` bytes, so `("ab", "c")` and `("a", "bc")` map to
/// different tenants.
pub fn resolve(credentials: Option<&Credentials>) -> TenantId {
    match credentials {
        Some(creds) => {
            let mut hasher = Sha256::new();
            hasher.update((creds.user.len() as u64).to_be_bytes());
            hasher.update(creds.user.as_bytes());
            hasher.update(creds.secret.as_bytes());
            TenantId::from_digest(hex::encode(hasher.finalize()))
        }
        None => TenantId::default_tenant(),
    }
}

/// Resolve the tenant from the raw value of an `Authorization` header.
pub fn resolve_header(header: Option<&str>) -> Result<TenantId> {
    match header {
        None => Ok(TenantId::default_tenant()),
        Some(value) => {
            let credentials = parse_basic(value)?;
            Ok(resolve(Some(&credentials)))
        }
    }
}

/// Parse `Basic base64(user:secret)`.
pub fn parse_basic(value: &str) -> Result<Credentials> {
    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| TablecastError::InvalidCredentials("missing scheme".to_string()))?;

    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(TablecastError::InvalidCredentials(format!(
            "unsupported scheme '{}'",
            scheme
        )));
    }

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| TablecastError::InvalidCredentials(format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| TablecastError::InvalidCredentials("credentials are not UTF-8".to_string()))?;

    let (user, secret) = decoded
        .split_once(':')
        .ok_or_else(|| TablecastError::InvalidCredentials("missing ':' separator".to_string()))?;

    Ok(Credentials::new(user, secret))
}
