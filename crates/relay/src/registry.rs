//! Connection registry: who is connected, in which role, bound to which
//! request.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerMessage;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// What a connection has registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    /// Connected but not yet registered.
    Unregistered,
    User,
    Admin,
}

/// Metadata for a single WebSocket connection.
pub struct Connection {
    pub role: ClientRole,
    /// The request this user connection is waiting on, once submitted.
    pub request_id: Option<String>,
    pub sender: WsSender,
}

/// Manages all active relay connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            role: ClientRole::Unregistered,
            request_id: None,
            sender: tx,
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Record the role a connection registered as.
    pub async fn set_role(&self, conn_id: &str, role: ClientRole) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.role = role;
        }
    }

    /// Bind a user connection to the request it submitted.
    pub async fn bind_request(&self, conn_id: &str, request_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.request_id = Some(request_id.to_string());
        }
    }

    /// Send a protocol message to one connection. Closed channels are
    /// silently skipped; the owning receive loop cleans them up.
    pub async fn send_to(&self, conn_id: &str, message: &ServerMessage) {
        if let Some(conn) = self.connections.read().await.get(conn_id) {
            let _ = conn.sender.send(encode(message));
        }
    }

    /// Send a protocol message to every registered admin.
    pub async fn broadcast_admins(&self, message: &ServerMessage) {
        let frame = encode(message);
        let conns = self.connections.read().await;
        for conn in conns.values() {
            if conn.role == ClientRole::Admin {
                let _ = conn.sender.send(frame.clone());
            }
        }
    }

    /// Send a protocol message to the user connection(s) bound to a
    /// request. Returns the number of connections reached.
    pub async fn send_to_request_owner(&self, request_id: &str, message: &ServerMessage) -> usize {
        let frame = encode(message);
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.request_id.as_deref() == Some(request_id) {
                let _ = conn.sender.send(frame.clone());
                count += 1;
            }
        }
        count
    }

    /// Current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Current number of registered admins.
    pub async fn admin_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.role == ClientRole::Admin)
            .count()
    }

    /// Send a Close frame to every connection, then clear the map. Used
    /// during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all relay connections");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a protocol message into a WebSocket text frame.
fn encode(message: &ServerMessage) -> Message {
    // Protocol enums serialize infallibly; fall back to a bare error frame
    // if that ever changes.
    let json = serde_json::to_string(message)
        .unwrap_or_else(|_| r#"{"type":"error","message":"encoding failed"}"#.to_string());
    Message::Text(json.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
