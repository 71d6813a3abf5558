//! WebSocket session tests
//!
//! Each test binds the real router to an ephemeral port and talks to it with
//! `tokio-tungstenite`, the way an external client would.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tablecast::server::{http, HttpServerState};
use tablecast::tenant::resolve;
use tablecast::{Credentials, SubscriptionHub, TableId, TableStore, TenantId};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestServer {
    addr: SocketAddr,
    store: Arc<TableStore>,
    hub: Arc<SubscriptionHub>,
}

async fn start_server() -> TestServer {
    let store = Arc::new(TableStore::in_memory());
    let hub = Arc::new(SubscriptionHub::new());
    let state = HttpServerState {
        store: store.clone(),
        hub: hub.clone(),
        broadcast_http_writes: false,
        max_body_bytes: 1024 * 1024,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(http::serve(
        listener,
        state,
        std::future::pending::<()>(),
        Duration::from_secs(1),
    ));

    TestServer { addr, store, hub }
}

async fn connect(addr: SocketAddr, path: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}{}", addr, path))
        .await
        .expect("websocket connect failed");
    ws
}

/// Connect and consume the tenant announcement.
async fn connect_ready(addr: SocketAddr, path: &str) -> Ws {
    let mut ws = connect(addr, path).await;
    let hello = next_text(&mut ws).await;
    assert!(hello.starts_with("TENANT: "), "unexpected greeting {:?}", hello);
    ws
}

async fn send_text(ws: &mut Ws, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Wait for the next text frame, skipping control frames.
async fn next_text(ws: &mut Ws) -> String {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read failed");
        match msg {
            Message::Text(text) => return text,
            Message::Close(frame) => panic!("connection closed: {:?}", frame),
            _ => continue,
        }
    }
}

/// Wait until the hub reports `expected` subscribers on `endpoint`.
async fn wait_for_subscribers(hub: &SubscriptionHub, endpoint: &str, expected: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while hub.subscriber_count(endpoint) != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {} subscribers on {}, have {}",
            expected,
            endpoint,
            hub.subscriber_count(endpoint)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_announces_default_tenant() {
    let server = start_server().await;
    let mut ws = connect(server.addr, "/ws/shop/prices").await;
    assert_eq!(next_text(&mut ws).await, "TENANT: default");
    assert_eq!(server.hub.subscriber_count("default/shop/prices"), 1);
}

#[tokio::test]
async fn test_announces_credential_tenant() {
    let server = start_server().await;

    let mut request = format!("ws://{}/ws/shop/prices", server.addr)
        .into_client_request()
        .unwrap();
    let auth = format!("Basic {}", BASE64.encode("alice:wonderland"));
    request
        .headers_mut()
        .insert("authorization", auth.parse().unwrap());
    let (mut ws, _) = connect_async(request).await.unwrap();

    let tenant = resolve(Some(&Credentials::new("alice", "wonderland")));
    assert_eq!(next_text(&mut ws).await, format!("TENANT: {}", tenant));
    wait_for_subscribers(&server.hub, &format!("{}/shop/prices", tenant), 1).await;
}

#[tokio::test]
async fn test_rejects_malformed_credentials() {
    let server = start_server().await;

    let mut request = format!("ws://{}/ws/shop/prices", server.addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("authorization", "Bearer nope".parse().unwrap());
    assert!(connect_async(request).await.is_err());
    assert_eq!(server.hub.stats().subscribers, 0);
}

#[tokio::test]
async fn test_rejects_invalid_table_name() {
    let server = start_server().await;
    let result = connect_async(format!("ws://{}/ws/shop/bad%20name", server.addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_exit_says_bye_and_unregisters() {
    let server = start_server().await;
    let mut ws = connect_ready(server.addr, "/ws/shop/prices").await;

    send_text(&mut ws, "exit").await;
    assert_eq!(next_text(&mut ws).await, "BYE");

    // Nothing but a close frame or end of stream follows.
    loop {
        match timeout(WAIT, ws.next()).await.expect("server kept connection open") {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
            Some(Ok(Message::Text(text))) => panic!("unexpected text after BYE: {}", text),
            Some(Ok(_)) => continue,
        }
    }
    wait_for_subscribers(&server.hub, "default/shop/prices", 0).await;
}

#[tokio::test]
async fn test_disconnect_unregisters_and_others_keep_receiving() {
    let server = start_server().await;
    let mut stays = connect_ready(server.addr, "/ws/shop/prices").await;
    let mut leaves = connect_ready(server.addr, "/ws/shop/prices").await;
    assert_eq!(server.hub.subscriber_count("default/shop/prices"), 2);

    leaves.close(None).await.unwrap();
    drop(leaves);
    wait_for_subscribers(&server.hub, "default/shop/prices", 1).await;

    send_text(&mut stays, "set color red").await;
    assert_eq!(next_text(&mut stays).await, "UPDATE: color: red");
    assert_eq!(server.hub.stats().evictions, 0);
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_command_replies() {
    let server = start_server().await;
    let mut ws = connect_ready(server.addr, "/ws/shop/prices").await;

    send_text(&mut ws, "ping").await;
    assert_eq!(next_text(&mut ws).await, "pong");

    send_text(&mut ws, "get color").await;
    assert_eq!(next_text(&mut ws).await, "");

    send_text(&mut ws, "set color deep   blue").await;
    assert_eq!(next_text(&mut ws).await, "UPDATE: color: deep blue");

    send_text(&mut ws, "get color").await;
    assert_eq!(next_text(&mut ws).await, "deep blue");

    send_text(&mut ws, "del color").await;
    assert_eq!(next_text(&mut ws).await, "Deleted color");

    send_text(&mut ws, "get color").await;
    assert_eq!(next_text(&mut ws).await, "");

    send_text(&mut ws, "jump around").await;
    assert_eq!(next_text(&mut ws).await, "Unknown command: jump");
}

#[tokio::test]
async fn test_malformed_and_binary_input_is_ignored() {
    let server = start_server().await;
    let mut ws = connect_ready(server.addr, "/ws/shop/prices").await;

    send_text(&mut ws, "set").await;
    send_text(&mut ws, "get").await;
    send_text(&mut ws, "   ").await;
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    send_text(&mut ws, "ping").await;
    assert_eq!(next_text(&mut ws).await, "pong");
}

#[tokio::test]
async fn test_set_is_persisted() {
    let server = start_server().await;
    let mut ws = connect_ready(server.addr, "/ws/shop/prices").await;

    send_text(&mut ws, "set apple 1.50").await;
    assert_eq!(next_text(&mut ws).await, "UPDATE: apple: 1.50");

    let id = TableId::new(TenantId::default_tenant(), "shop", "prices").unwrap();
    assert_eq!(
        server.store.get_key(&id, "apple").await.unwrap().as_deref(),
        Some("1.50")
    );
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_set_broadcasts_to_all_subscribers() {
    let server = start_server().await;
    let mut a = connect_ready(server.addr, "/ws/shop/prices").await;
    let mut b = connect_ready(server.addr, "/ws/shop/prices").await;

    send_text(&mut a, "set color red").await;
    assert_eq!(next_text(&mut a).await, "UPDATE: color: red");
    assert_eq!(next_text(&mut b).await, "UPDATE: color: red");
}

#[tokio::test]
async fn test_broadcast_is_scoped_to_table_and_tenant() {
    let server = start_server().await;
    let mut writer = connect_ready(server.addr, "/ws/shop/prices").await;
    let mut other_table = connect_ready(server.addr, "/ws/shop/stock").await;

    let mut request = format!("ws://{}/ws/shop/prices", server.addr)
        .into_client_request()
        .unwrap();
    let auth = format!("Basic {}", BASE64.encode("bob:builder"));
    request
        .headers_mut()
        .insert("authorization", auth.parse().unwrap());
    let (mut other_tenant, _) = connect_async(request).await.unwrap();
    next_text(&mut other_tenant).await;

    send_text(&mut writer, "set color red").await;
    assert_eq!(next_text(&mut writer).await, "UPDATE: color: red");

    // A ping reply arriving first proves no update was queued ahead of it.
    send_text(&mut other_table, "ping").await;
    assert_eq!(next_text(&mut other_table).await, "pong");
    send_text(&mut other_tenant, "ping").await;
    assert_eq!(next_text(&mut other_tenant).await, "pong");
}

#[tokio::test]
async fn test_updates_arrive_in_commit_order() {
    let server = start_server().await;
    let mut writer = connect_ready(server.addr, "/ws/shop/counter").await;
    let mut reader = connect_ready(server.addr, "/ws/shop/counter").await;

    for i in 0..50 {
        send_text(&mut writer, &format!("set n {}", i)).await;
    }
    for i in 0..50 {
        assert_eq!(next_text(&mut reader).await, format!("UPDATE: n: {}", i));
    }
}

#[tokio::test]
async fn test_concurrent_writers_are_seen_in_same_order_by_all() {
    let server = start_server().await;
    let mut w1 = connect_ready(server.addr, "/ws/shop/race").await;
    let mut w2 = connect_ready(server.addr, "/ws/shop/race").await;
    let mut observer = connect_ready(server.addr, "/ws/shop/race").await;

    let first = async {
        for i in 0..20 {
            send_text(&mut w1, &format!("set a {}", i)).await;
        }
    };
    let second = async {
        for i in 0..20 {
            send_text(&mut w2, &format!("set b {}", i)).await;
        }
    };
    tokio::join!(first, second);

    let mut seen = Vec::new();
    for _ in 0..40 {
        seen.push(next_text(&mut observer).await);
    }
    let mut w1_seen = Vec::new();
    for _ in 0..40 {
        w1_seen.push(next_text(&mut w1).await);
    }
    assert_eq!(seen, w1_seen);

    // Each writer's own updates stay in the order it sent them.
    let a: Vec<_> = seen.iter().filter(|m| m.starts_with("UPDATE: a: ")).cloned().collect();
    let expected: Vec<_> = (0..20).map(|i| format!("UPDATE: a: {}", i)).collect();
    assert_eq!(a, expected);
}
