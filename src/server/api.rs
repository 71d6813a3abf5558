//! HTTP REST API for table access
//!
//! ## Endpoints
//!
//! - `GET /api/{object}/{table}` - Full document as `{"data": {...}}`
//! - `GET /api/{object}/{table}/{key}` - Raw value, empty body if absent
//! - `POST /api/{object}/{table}/{key}` - Upsert, request body is the value
//! - `DELETE /api/{object}/{table}/{key}` - Remove the key
//!
//! The tenant comes from an optional `Authorization: Basic ...` header.
//!
//! Writes made here are not broadcast to streaming subscribers unless
//! `broadcast_http_writes` is enabled, and deletes are never broadcast.

use crate::error::{ErrorHint, Result, StorageError, TablecastError};
use crate::protocol::command::{deleted_message, update_message};
use crate::pubsub::SubscriptionHub;
use crate::storage::{TableId, TableStore};
use crate::tenant::resolve_header;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    /// Document store
    pub store: Arc<TableStore>,
    /// Streaming subscribers, only used when HTTP writes are broadcast
    pub hub: Arc<SubscriptionHub>,
    /// Broadcast `POST` writes to streaming subscribers
    pub broadcast_http_writes: bool,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "INVALID_NAME", "STORAGE_ERROR")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Actionable hint for resolving the error (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            hint: None,
        }
    }

    fn from_tablecast_error(err: &TablecastError) -> (StatusCode, Self) {
        let (status, code) = match err {
            TablecastError::InvalidName(_) => (StatusCode::BAD_REQUEST, "INVALID_NAME"),
            TablecastError::InvalidCredentials(_) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
            }
            TablecastError::StorageDomain(StorageError::Corrupted { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_CORRUPTED")
            }
            TablecastError::StorageDomain(_)
            | TablecastError::Io(_)
            | TablecastError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let mut body = Self::new(code, err.to_string());
        body.hint = err.hint();
        (status, body)
    }
}

/// Convert an error into an HTTP response
pub fn error_response(err: &TablecastError) -> Response {
    let (status, body) = ErrorResponse::from_tablecast_error(err);
    if err.is_client_error() {
        debug!(error = %err, status = status.as_u16(), "Request rejected");
    } else {
        error!(error = %err, status = status.as_u16(), "Request failed");
    }
    (status, Json(body)).into_response()
}

/// Resolve the table a request addresses from its headers and path
pub fn table_id_from_request(headers: &HeaderMap, object: &str, table: &str) -> Result<TableId> {
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|value| {
            value.to_str().map_err(|_| {
                TablecastError::InvalidCredentials("header is not valid ASCII".to_string())
            })
        })
        .transpose()?;
    let tenant = resolve_header(authorization)?;
    TableId::new(tenant, object, table)
}

/// Create the REST API router
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/:object/:table", get(get_table))
        .route(
            "/api/:object/:table/:key",
            get(get_key).post(set_key).delete(delete_key),
        )
        .with_state(state)
}

/// Fetch the whole document
async fn get_table(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((object, table)): Path<(String, String)>,
) -> Response {
    let id = match table_id_from_request(&headers, &object, &table) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.store.get_all(&id).await {
        Ok(doc) => {
            debug!(table = %id, keys = doc.len(), "Fetched table");
            (StatusCode::OK, Json(doc)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Fetch one value
async fn get_key(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((object, table, key)): Path<(String, String, String)>,
) -> Response {
    let id = match table_id_from_request(&headers, &object, &table) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.store.get_key(&id, &key).await {
        Ok(value) => (StatusCode::OK, value.unwrap_or_default()).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Upsert one value from the raw request body
async fn set_key(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((object, table, key)): Path<(String, String, String)>,
    value: String,
) -> Response {
    let id = match table_id_from_request(&headers, &object, &table) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    let result = if state.broadcast_http_writes {
        let endpoint = id.endpoint();
        let message = update_message(&key, &value);
        let hub = state.hub.clone();
        state
            .store
            .set_key_then(&id, &key, &value, move || {
                hub.broadcast(&endpoint, &message);
            })
            .await
    } else {
        state.store.set_key(&id, &key, &value).await
    };

    match result {
        Ok(()) => {
            debug!(table = %id, key = %key, "Set key via HTTP");
            (StatusCode::OK, format!("SET: {}", key)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Remove one key. Absent keys succeed.
async fn delete_key(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((object, table, key)): Path<(String, String, String)>,
) -> Response {
    let id = match table_id_from_request(&headers, &object, &table) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.store.delete_key(&id, &key).await {
        Ok(existed) => {
            debug!(table = %id, key = %key, existed, "Deleted key via HTTP");
            (StatusCode::OK, deleted_message(&key)).into_response()
        }
        Err(e) => error_response(&e),
    }
}
