//! Per-connection WebSocket session handling and message dispatch.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{SinkExt, StreamExt};

use rgate_core::lifecycle::{RequestAction, STATUS_APPROVED, STATUS_DENIED};
use rgate_core::validation::validate_user_name;
use rgate_store::{NewRequest, RequestStore, StatusChange};

use crate::codes::{code_expiry, generate_access_code};
use crate::protocol::{ClientMessage, ServerMessage, UserInfo};
use crate::registry::ClientRole;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the registry.
///   2. Spawns a sender task that forwards messages from the registry
///      channel.
///   3. Dispatches inbound protocol messages on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, peer = %peer, "Relay client connected");

    let mut rx = state.registry.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => dispatch(&state, &conn_id, peer, msg).await,
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Malformed frame");
                    state
                        .registry
                        .send_to(
                            &conn_id,
                            &ServerMessage::Error {
                                message: "Invalid message format".into(),
                            },
                        )
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.registry.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Relay client disconnected");
}

/// Route one inbound protocol message.
async fn dispatch(state: &AppState, conn_id: &str, peer: SocketAddr, msg: ClientMessage) {
    match msg {
        ClientMessage::RegisterUser => {
            state.registry.set_role(conn_id, ClientRole::User).await;
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::UserRegistered {
                        message: "Connected to access request system".into(),
                    },
                )
                .await;
        }

        ClientMessage::RegisterAdmin => {
            state.registry.set_role(conn_id, ClientRole::Admin).await;
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::AdminRegistered {
                        message: "Admin dashboard connected".into(),
                    },
                )
                .await;

            // Replay every live request to the newly connected admin,
            // oldest first so the dashboard fills in submission order.
            let mut requests = state.store.all().await;
            requests.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            for request in requests {
                state
                    .registry
                    .send_to(conn_id, &ServerMessage::access_request(request))
                    .await;
            }
        }

        ClientMessage::RequestAccess { user_info } => {
            handle_request_access(state, conn_id, peer, user_info).await;
        }

        ClientMessage::ApproveRequest { request_id } => {
            handle_approve(state, conn_id, &request_id).await;
        }

        ClientMessage::DenyRequest { request_id } => {
            handle_deny(state, conn_id, &request_id).await;
        }

        ClientMessage::ValidateCode { code } => {
            handle_validate_code(state, conn_id, &code).await;
        }
    }
}

async fn handle_request_access(
    state: &AppState,
    conn_id: &str,
    peer: SocketAddr,
    user_info: UserInfo,
) {
    let user_name = match validate_user_name(&user_info.user_name) {
        Ok(name) => name,
        Err(e) => {
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            return;
        }
    };

    let token = user_info
        .token
        .unwrap_or_else(|| "direct_access".to_string());

    let mut origin = user_info.origin.unwrap_or_default();
    if origin.ip.is_none() {
        origin.ip = Some(peer.ip().to_string());
    }

    let request = match state
        .store
        .create(NewRequest::new(user_name, token).with_origin(origin))
        .await
    {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Request creation failed");
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            return;
        }
    };

    state.registry.bind_request(conn_id, &request.id).await;
    tracing::info!(
        request_id = %request.id,
        user_name = %request.user_name,
        "Access request submitted"
    );

    state
        .registry
        .broadcast_admins(&ServerMessage::access_request(request.clone()))
        .await;

    state
        .registry
        .send_to(
            conn_id,
            &ServerMessage::RequestSubmitted {
                request_id: request.id,
                message: "Access request sent to administrator. Please wait for approval.".into(),
            },
        )
        .await;
}

async fn handle_approve(state: &AppState, conn_id: &str, request_id: &str) {
    let access_code = generate_access_code();
    let expires_at = code_expiry(state.config.code_ttl_mins);

    let change = StatusChange::new(RequestAction::Approve, format!("admin:{conn_id}"))
        .with_access_code(access_code.clone(), expires_at);

    match state.store.update(request_id, change).await {
        Ok(_) => {
            tracing::info!(request_id = %request_id, "Request approved");

            let reached = state
                .registry
                .send_to_request_owner(
                    request_id,
                    &ServerMessage::RequestApproved {
                        access_code: access_code.clone(),
                        expires_at,
                        message: format!(
                            "Access approved! You have {} minutes of access.",
                            state.config.code_ttl_mins
                        ),
                    },
                )
                .await;
            if reached == 0 {
                tracing::warn!(request_id = %request_id, "No user connection for approval");
            }

            state
                .registry
                .broadcast_admins(&ServerMessage::RequestUpdated {
                    request_id: request_id.to_string(),
                    status: STATUS_APPROVED.to_string(),
                    access_code: Some(access_code),
                })
                .await;
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Approve failed");
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
        }
    }
}

async fn handle_deny(state: &AppState, conn_id: &str, request_id: &str) {
    let change = StatusChange::new(RequestAction::Deny, format!("admin:{conn_id}"));

    match state.store.update(request_id, change).await {
        Ok(_) => {
            tracing::info!(request_id = %request_id, "Request denied");

            state
                .registry
                .send_to_request_owner(
                    request_id,
                    &ServerMessage::RequestDenied {
                        message: "Access request denied by administrator.".into(),
                    },
                )
                .await;

            state
                .registry
                .broadcast_admins(&ServerMessage::RequestUpdated {
                    request_id: request_id.to_string(),
                    status: STATUS_DENIED.to_string(),
                    access_code: None,
                })
                .await;
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Deny failed");
            state
                .registry
                .send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
        }
    }
}

/// Check a submitted access code against all live requests.
///
/// A linear scan: codes are short-lived, the request set is small, and the
/// check is not scoped to a single requester.
async fn handle_validate_code(state: &AppState, conn_id: &str, code: &str) {
    let now = Utc::now();
    let valid = state.store.all().await.iter().any(|r| {
        r.access_code.as_deref() == Some(code)
            && r.status == STATUS_APPROVED
            && !r.code_expired(now)
    });

    state
        .registry
        .send_to(
            conn_id,
            &ServerMessage::CodeValidation {
                valid,
                message: if valid {
                    "Access code valid".into()
                } else {
                    "Invalid or expired access code".into()
                },
            },
        )
        .await;
}
