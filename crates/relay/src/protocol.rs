//! Wire protocol: JSON messages over a single WebSocket per client.
//!
//! Message `type` values and field names match what the dashboard and user
//! pages already speak, so both serialize in camelCase with snake_case
//! type tags.

use serde::{Deserialize, Serialize};

use rgate_core::types::Timestamp;
use rgate_store::{AccessRequest, OriginInfo};

/// User-supplied fields of an access request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginInfo>,
}

/// Messages a client may send to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    RegisterUser,
    #[serde(rename_all = "camelCase")]
    RequestAccess { user_info: UserInfo },
    ValidateCode { code: String },
    RegisterAdmin,
    #[serde(rename_all = "camelCase")]
    ApproveRequest { request_id: String },
    #[serde(rename_all = "camelCase")]
    DenyRequest { request_id: String },
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    UserRegistered {
        message: String,
    },
    AdminRegistered {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RequestSubmitted {
        request_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RequestApproved {
        access_code: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        expires_at: Timestamp,
        message: String,
    },
    RequestDenied {
        message: String,
    },
    CodeValidation {
        valid: bool,
        message: String,
    },
    /// A live request pushed to the admin dashboard; the full record is
    /// flattened alongside the explicit id.
    #[serde(rename_all = "camelCase")]
    AccessRequest {
        request_id: String,
        #[serde(flatten)]
        request: AccessRequest,
    },
    #[serde(rename_all = "camelCase")]
    RequestUpdated {
        request_id: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_code: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Push a record to the dashboard.
    pub fn access_request(request: AccessRequest) -> Self {
        ServerMessage::AccessRequest {
            request_id: request.id.clone(),
            request,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rgate_store::NewRequest;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "register_admin"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::RegisterAdmin));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "request_access", "userInfo": {"userName": "Jane Doe", "token": "test123"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::RequestAccess { user_info } => {
                assert_eq!(user_info.user_name, "Jane Doe");
                assert_eq!(user_info.token.as_deref(), Some("test123"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn approve_request_uses_camel_case_request_id() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "approve_request", "requestId": "req_1"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ApproveRequest { request_id } if request_id == "req_1"));
    }

    #[test]
    fn request_approved_serializes_epoch_ms_expiry() {
        let msg = ServerMessage::RequestApproved {
            access_code: "123456".into(),
            expires_at: chrono::Utc::now(),
            message: "Access approved".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "request_approved");
        assert_eq!(value["accessCode"], "123456");
        assert!(value["expiresAt"].is_i64());
    }

    #[test]
    fn access_request_flattens_record_fields() {
        let request = NewRequest::new("Jane Doe", "test123").into_request();
        let id = request.id.clone();
        let value = serde_json::to_value(ServerMessage::access_request(request)).unwrap();

        assert_eq!(value["type"], "access_request");
        assert_eq!(value["requestId"], id.as_str());
        assert_eq!(value["userName"], "Jane Doe");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn request_updated_omits_missing_code() {
        let value = serde_json::to_value(ServerMessage::RequestUpdated {
            request_id: "req_1".into(),
            status: "denied".into(),
            access_code: None,
        })
        .unwrap();

        assert_eq!(value["type"], "request_updated");
        assert!(value.get("accessCode").is_none());
    }
}
