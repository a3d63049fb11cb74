//! End-to-end relay tests: real server on an ephemeral port, real
//! WebSocket clients driving the protocol.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rgate_relay::config::RelayConfig;
use rgate_relay::routes;
use rgate_relay::state::AppState;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a relay on an ephemeral port and return its address.
async fn spawn_relay() -> SocketAddr {
    let state = AppState::new(RelayConfig::default());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Receive the next text frame as JSON, skipping control frames.
async fn recv_json(ws: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("frame ok");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn register_admin(ws: &mut WsClient) {
    send_json(ws, json!({"type": "register_admin"})).await;
    let ack = recv_json(ws).await;
    assert_eq!(ack["type"], "admin_registered");
}

async fn register_user(ws: &mut WsClient) {
    send_json(ws, json!({"type": "register_user"})).await;
    let ack = recv_json(ws).await;
    assert_eq!(ack["type"], "user_registered");
}

/// Submit an access request and return its id.
async fn submit_request(ws: &mut WsClient, user_name: &str) -> String {
    send_json(
        ws,
        json!({
            "type": "request_access",
            "userInfo": {"userName": user_name, "token": "test123"}
        }),
    )
    .await;
    let submitted = recv_json(ws).await;
    assert_eq!(submitted["type"], "request_submitted");
    submitted["requestId"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Test: full approve flow, ending in a valid access code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approve_flow_delivers_code_to_user() {
    let addr = spawn_relay().await;

    let mut admin = connect(addr).await;
    register_admin(&mut admin).await;

    let mut user = connect(addr).await;
    register_user(&mut user).await;
    let request_id = submit_request(&mut user, "Jane Doe").await;

    // The admin dashboard sees the new request immediately.
    let pushed = recv_json(&mut admin).await;
    assert_eq!(pushed["type"], "access_request");
    assert_eq!(pushed["requestId"], request_id.as_str());
    assert_eq!(pushed["userName"], "Jane Doe");
    assert_eq!(pushed["status"], "pending");

    // Approve it.
    send_json(
        &mut admin,
        json!({"type": "approve_request", "requestId": request_id}),
    )
    .await;

    // The user learns of the approval and receives a 6-digit code.
    let approved = recv_json(&mut user).await;
    assert_eq!(approved["type"], "request_approved");
    let code = approved["accessCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert!(approved["expiresAt"].is_i64());

    // All admins see the status change.
    let updated = recv_json(&mut admin).await;
    assert_eq!(updated["type"], "request_updated");
    assert_eq!(updated["status"], "approved");

    // The issued code validates; a wrong one does not.
    send_json(&mut user, json!({"type": "validate_code", "code": code})).await;
    let validation = recv_json(&mut user).await;
    assert_eq!(validation["type"], "code_validation");
    assert_eq!(validation["valid"], true);

    send_json(&mut user, json!({"type": "validate_code", "code": "000000"})).await;
    let validation = recv_json(&mut user).await;
    assert_eq!(validation["valid"], false);
}

// ---------------------------------------------------------------------------
// Test: deny flow notifies the requesting user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deny_flow_notifies_user() {
    let addr = spawn_relay().await;

    let mut admin = connect(addr).await;
    register_admin(&mut admin).await;

    let mut user = connect(addr).await;
    register_user(&mut user).await;
    let request_id = submit_request(&mut user, "Ben Okri").await;

    // Drain the dashboard push.
    let pushed = recv_json(&mut admin).await;
    assert_eq!(pushed["type"], "access_request");

    send_json(
        &mut admin,
        json!({"type": "deny_request", "requestId": request_id}),
    )
    .await;

    let denied = recv_json(&mut user).await;
    assert_eq!(denied["type"], "request_denied");

    let updated = recv_json(&mut admin).await;
    assert_eq!(updated["type"], "request_updated");
    assert_eq!(updated["status"], "denied");
}

// ---------------------------------------------------------------------------
// Test: a late-joining admin gets the live request set replayed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_admin_receives_replay() {
    let addr = spawn_relay().await;

    let mut user = connect(addr).await;
    register_user(&mut user).await;
    let request_id = submit_request(&mut user, "Jane Doe").await;

    let mut admin = connect(addr).await;
    register_admin(&mut admin).await;

    let replayed = recv_json(&mut admin).await;
    assert_eq!(replayed["type"], "access_request");
    assert_eq!(replayed["requestId"], request_id.as_str());
}

// ---------------------------------------------------------------------------
// Test: a malformed name is rejected before any request is created
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_name_is_rejected() {
    let addr = spawn_relay().await;

    let mut user = connect(addr).await;
    register_user(&mut user).await;

    send_json(
        &mut user,
        json!({
            "type": "request_access",
            "userInfo": {"userName": "Test123", "token": "test123"}
        }),
    )
    .await;

    let reply = recv_json(&mut user).await;
    assert_eq!(reply["type"], "error");
}

// ---------------------------------------------------------------------------
// Test: approving an unknown request reports an error to the admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approve_unknown_request_reports_error() {
    let addr = spawn_relay().await;

    let mut admin = connect(addr).await;
    register_admin(&mut admin).await;

    send_json(
        &mut admin,
        json!({"type": "approve_request", "requestId": "req_missing"}),
    )
    .await;

    let reply = recv_json(&mut admin).await;
    assert_eq!(reply["type"], "error");
}

// ---------------------------------------------------------------------------
// Test: a second approve of the same request is an invalid transition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn double_approve_is_rejected() {
    let addr = spawn_relay().await;

    let mut admin = connect(addr).await;
    register_admin(&mut admin).await;

    let mut user = connect(addr).await;
    register_user(&mut user).await;
    let request_id = submit_request(&mut user, "Jane Doe").await;
    let _pushed = recv_json(&mut admin).await;

    send_json(
        &mut admin,
        json!({"type": "approve_request", "requestId": request_id}),
    )
    .await;
    let updated = recv_json(&mut admin).await;
    assert_eq!(updated["type"], "request_updated");

    // Approving again must fail without altering anything.
    send_json(
        &mut admin,
        json!({"type": "approve_request", "requestId": request_id}),
    )
    .await;
    let reply = recv_json(&mut admin).await;
    assert_eq!(reply["type"], "error");
}

// ---------------------------------------------------------------------------
// Test: a garbage frame yields a protocol error, not a dropped connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_frame_yields_error() {
    let addr = spawn_relay().await;

    let mut user = connect(addr).await;
    user.send(Message::Text("not json".to_string()))
        .await
        .unwrap();

    let reply = recv_json(&mut user).await;
    assert_eq!(reply["type"], "error");

    // The connection is still usable afterwards.
    register_user(&mut user).await;
}
