//! HTTP server for the REST API, WebSocket sessions and health checks
//!
//! - `/health` - Liveness plus store and hub counters
//! - `/api/*` - Table REST API
//! - `/ws/*` - Streaming table sessions

use crate::error::{Result, TablecastError};
use crate::pubsub::SubscriptionHub;
use crate::server::api::{create_api_router, ApiState};
use crate::server::websocket::{create_websocket_router, WebSocketState};
use crate::storage::TableStore;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct HttpServerState {
    pub store: Arc<TableStore>,
    pub hub: Arc<SubscriptionHub>,
    /// Broadcast REST writes to streaming subscribers
    pub broadcast_http_writes: bool,
    /// Maximum accepted request body size
    pub max_body_bytes: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    /// Tables touched since startup
    pub tables_tracked: usize,
    /// Endpoints with live subscribers
    pub endpoints: usize,
    /// Live subscribers across all endpoints
    pub subscribers: usize,
}

/// Build the full application router
pub fn build_router(state: HttpServerState) -> Router {
    let api_state = ApiState {
        store: state.store.clone(),
        hub: state.hub.clone(),
        broadcast_http_writes: state.broadcast_http_writes,
    };
    let ws_state = WebSocketState {
        store: state.store.clone(),
        hub: state.hub.clone(),
    };
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(create_api_router(api_state))
        .merge(create_websocket_router(ws_state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

/// Bind `addr` and serve until `shutdown` resolves.
///
/// After `shutdown` resolves, in-flight requests get `shutdown_timeout` to
/// finish before the server stops waiting for them.
pub async fn start_http_server<F>(
    addr: SocketAddr,
    state: HttpServerState,
    shutdown: F,
    shutdown_timeout: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            let port = addr.port();
            TablecastError::server_bind_failed(
                addr.to_string(),
                format!(
                    "HTTP port {} is already in use. \
                     Fix: Use --http-addr 0.0.0.0:{} to pick a different port, \
                     or stop the existing process.",
                    port,
                    port.saturating_add(100)
                ),
            )
        } else {
            TablecastError::server_bind_failed(addr.to_string(), e.to_string())
        }
    })?;

    serve(listener, state, shutdown, shutdown_timeout).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: HttpServerState,
    shutdown: F,
    shutdown_timeout: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    let app = build_router(state);
    info!(addr = %local_addr, "Starting HTTP server (REST API, WebSocket, health)");

    let signalled = Arc::new(Notify::new());
    let trigger = signalled.clone();
    let graceful = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            trigger.notify_one();
        })
        .into_future();

    tokio::select! {
        result = graceful => {
            result.map_err(|e| TablecastError::server_shutdown(e.to_string()))?;
            info!("HTTP server stopped");
        }
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, dropping remaining connections"
            );
        }
    }

    Ok(())
}

/// Health check endpoint handler
async fn health_handler(State(state): State<HttpServerState>) -> Response {
    let stats = state.hub.stats();
    let status = HealthStatus {
        status: "ok".to_string(),
        backend: state.store.backend_name().to_string(),
        tables_tracked: state.store.tracked_tables(),
        endpoints: stats.endpoints,
        subscribers: stats.subscribers,
    };
    (StatusCode::OK, Json(status)).into_response()
}
