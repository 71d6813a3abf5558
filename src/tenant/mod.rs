//! Tenant partitioning for Tablecast
//!
//! Every table lives inside a tenant. A tenant is identified either by a
//! SHA-256 digest derived from the caller's credentials or by the literal
//! [`DEFAULT_TENANT`] marker when no credentials are supplied.
//!
//! # Design
//!
//! Resolution is a pure function: no registry of tenants exists and none
//! is needed. Two callers presenting the same `(user, secret)` pair land in
//! the same tenant; any change to either half lands them somewhere else.

pub mod resolver;
pub mod types;

pub use resolver::{resolve, resolve_header};
pub use types::{Credentials, TenantId, DEFAULT_TENANT};
