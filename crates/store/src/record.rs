//! Request record model and status change application.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use rgate_core::error::CoreError;
use rgate_core::lifecycle::{RequestAction, DENIED_VISIBILITY_MINS, STATUS_DENIED, STATUS_PENDING};
use rgate_core::types::{generate_request_id, Timestamp};

/// Optional client enrichment captured at creation time.
///
/// Purely informational; never re-validated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One user's access attempt, tracked through the lifecycle.
///
/// Field names serialize in camelCase to match the persisted document and
/// the relay wire format; timestamps serialize as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: String,
    pub user_name: String,
    pub token: String,
    pub status: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginInfo>,
}

impl AccessRequest {
    /// True when this record should appear on the operator dashboard:
    /// everything pending, approved, or granted, plus denied records whose
    /// processing is within the sliding visibility window.
    pub fn visible_to_operator(&self, now: Timestamp) -> bool {
        match self.status.as_str() {
            STATUS_DENIED => self
                .processed_at
                .is_some_and(|at| now - at < chrono::Duration::minutes(DENIED_VISIBILITY_MINS)),
            _ => true,
        }
    }

    /// True when an attached access code exists and its expiry has passed.
    pub fn code_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Input for creating a request. The store assigns id, status, and
/// timestamp.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub user_name: String,
    pub token: String,
    pub origin: Option<OriginInfo>,
}

impl NewRequest {
    pub fn new(user_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            token: token.into(),
            origin: None,
        }
    }

    /// Attach client enrichment.
    pub fn with_origin(mut self, origin: OriginInfo) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Materialize a pending [`AccessRequest`] with a fresh id.
    pub fn into_request(self) -> AccessRequest {
        AccessRequest {
            id: generate_request_id(),
            user_name: self.user_name,
            token: self.token,
            status: STATUS_PENDING.to_string(),
            timestamp: Utc::now(),
            processed_at: None,
            processed_by: None,
            access_code: None,
            expires_at: None,
            origin: self.origin,
        }
    }
}

/// An operator-attributed status mutation, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub action: RequestAction,
    pub operator: String,
    /// Access code attached on approval (relay variant).
    pub access_code: Option<String>,
    /// Expiry for the attached access code.
    pub expires_at: Option<Timestamp>,
}

impl StatusChange {
    pub fn new(action: RequestAction, operator: impl Into<String>) -> Self {
        Self {
            action,
            operator: operator.into(),
            access_code: None,
            expires_at: None,
        }
    }

    /// Attach an access code and its expiry, applied alongside the status.
    pub fn with_access_code(mut self, code: impl Into<String>, expires_at: Timestamp) -> Self {
        self.access_code = Some(code.into());
        self.expires_at = Some(expires_at);
        self
    }

    /// Apply this change to a record in place.
    ///
    /// Reads the record's current status and validates the transition
    /// through [`RequestAction::apply`]; on failure the record is left
    /// untouched. Processing marks are set on every action except
    /// reactivate, which clears them together with any attached code.
    pub fn apply_to(&self, request: &mut AccessRequest, now: Timestamp) -> Result<(), CoreError> {
        let next = self.action.apply(&request.status)?;
        request.status = next.to_string();

        if self.action.clears_processing_marks() {
            request.processed_at = None;
            request.processed_by = None;
            request.access_code = None;
            request.expires_at = None;
        } else {
            request.processed_at = Some(now);
            request.processed_by = Some(self.operator.clone());
            if let Some(code) = &self.access_code {
                request.access_code = Some(code.clone());
            }
            if let Some(at) = self.expires_at {
                request.expires_at = Some(at);
            }
        }

        Ok(())
    }
}

/// Sort dashboard lists newest-first.
pub fn sort_for_operator(requests: &mut [AccessRequest]) {
    requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
