//! WebSocket gateway for live table sessions
//!
//! ## Endpoint
//!
//! - `GET /ws/{object}/{table}` - Open a command session on one table
//!
//! The tenant is resolved from the upgrade request's `Authorization` header,
//! the same way as for the REST API. A rejected header or invalid name fails
//! the upgrade with the REST error response.
//!
//! ## Protocol
//!
//! The first frame sent is `TENANT: <tenant-id>`. After that the client sends
//! text commands (see [`crate::protocol::command`]) and receives replies plus
//! `UPDATE: <key>: <value>` frames for every `set` committed on the table by
//! any connection.

use crate::protocol::{CommandSession, Outcome};
use crate::pubsub::{Mailbox, SubscriptionHub};
use crate::server::api::{error_response, table_id_from_request};
use crate::storage::{TableId, TableStore};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// WebSocket state shared across connections
#[derive(Clone)]
pub struct WebSocketState {
    /// Document store
    pub store: Arc<TableStore>,
    /// Subscriber registry
    pub hub: Arc<SubscriptionHub>,
}

/// Why a connection loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Client sent `exit`
    Exit,
    /// Client sent a close frame or the stream ended
    PeerClosed,
    /// Read or write on the socket failed
    Transport,
    /// Hub dropped this subscriber after a failed delivery
    Evicted,
}

impl CloseReason {
    fn as_str(self) -> &'static str {
        match self {
            CloseReason::Exit => "exit",
            CloseReason::PeerClosed => "peer_closed",
            CloseReason::Transport => "transport_error",
            CloseReason::Evicted => "evicted",
        }
    }
}

/// Create the WebSocket router
pub fn create_websocket_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/ws/:object/:table", get(ws_table))
        .with_state(state)
}

/// WebSocket handler for a table session
async fn ws_table(
    ws: WebSocketUpgrade,
    State(state): State<WebSocketState>,
    headers: HeaderMap,
    Path((object, table)): Path<(String, String)>,
) -> Response {
    let id = match table_id_from_request(&headers, &object, &table) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    debug!(table = %id, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_connection(socket, state, id))
}

/// Run one connection from registration to unregistration
async fn handle_connection(socket: WebSocket, state: WebSocketState, id: TableId) {
    let session = CommandSession::new(id, state.store.clone(), state.hub.clone());
    let endpoint = session.endpoint().to_string();

    let (subscriber, mut mailbox) = state.hub.new_subscriber();
    let subscriber_id = subscriber.id();
    state.hub.subscribe(&endpoint, subscriber);
    info!(endpoint = %endpoint, subscriber = subscriber_id, "Streaming connection opened");

    let (mut sender, mut receiver) = socket.split();
    let reason = run_session(&session, &mut sender, &mut receiver, &mut mailbox).await;

    state.hub.unsubscribe(&endpoint, subscriber_id);
    if reason != CloseReason::Transport {
        let _ = sender.close().await;
    }

    info!(
        endpoint = %endpoint,
        subscriber = subscriber_id,
        reason = reason.as_str(),
        "Streaming connection closed"
    );
}

/// Announce the tenant, then serve commands and forward broadcasts until
/// the connection ends.
async fn run_session(
    session: &CommandSession,
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    mailbox: &mut Mailbox,
) -> CloseReason {
    if sender
        .send(Message::Text(session.announcement()))
        .await
        .is_err()
    {
        return CloseReason::Transport;
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => match session.handle_text(&text).await {
                    Outcome::Silent => {}
                    Outcome::Reply(reply) => {
                        if sender.send(Message::Text(reply)).await.is_err() {
                            return CloseReason::Transport;
                        }
                    }
                    Outcome::Close(reply) => {
                        let _ = sender.send(Message::Text(reply)).await;
                        return CloseReason::Exit;
                    }
                },
                Some(Ok(Message::Close(_))) | None => return CloseReason::PeerClosed,
                Some(Ok(_)) => {
                    // Binary, ping and pong frames carry no commands
                }
                Some(Err(e)) => {
                    debug!(endpoint = %session.endpoint(), error = %e, "WebSocket read failed");
                    return CloseReason::Transport;
                }
            },
            update = mailbox.recv() => match update {
                Some(text) => {
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        debug!(endpoint = %session.endpoint(), error = %e, "WebSocket write failed");
                        return CloseReason::Transport;
                    }
                }
                None => {
                    warn!(endpoint = %session.endpoint(), "Subscriber evicted, closing connection");
                    return CloseReason::Evicted;
                }
            },
        }
    }
}
