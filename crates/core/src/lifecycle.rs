//! Request lifecycle status constants and transition rules.
//!
//! A request moves `pending -> approved -> granted` on the happy path, may
//! be denied or revoked at any processed stage, and a denied request can be
//! reactivated back to pending by an operator. Every status mutation in the
//! stores goes through [`RequestAction::apply`].

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Initial status for a newly submitted request.
pub const STATUS_PENDING: &str = "pending";
/// An operator approved the request; the user is waiting for the grant.
pub const STATUS_APPROVED: &str = "approved";
/// Full procedure access was granted.
pub const STATUS_GRANTED: &str = "granted";
/// The request was denied or access was revoked.
pub const STATUS_DENIED: &str = "denied";

/// All valid request statuses.
pub const VALID_STATUSES: &[&str] =
    &[STATUS_PENDING, STATUS_APPROVED, STATUS_GRANTED, STATUS_DENIED];

/// How long a denied request stays visible on the operator dashboard.
pub const DENIED_VISIBILITY_MINS: i64 = 5;

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Returns the set of statuses that `from_status` may transition to.
///
/// Transition rules:
/// - `pending`  -> `approved`, `denied`
/// - `approved` -> `granted`, `denied` (revoke)
/// - `granted`  -> `denied` (revoke)
/// - `denied`   -> `pending` (reactivate)
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_PENDING => &[STATUS_APPROVED, STATUS_DENIED],
        STATUS_APPROVED => &[STATUS_GRANTED, STATUS_DENIED],
        STATUS_GRANTED => &[STATUS_DENIED],
        STATUS_DENIED => &[STATUS_PENDING],
        _ => &[],
    }
}

/// Validate that a status string is one of the known statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid request status '{}'. Must be one of: {:?}",
            status, VALID_STATUSES
        )))
    }
}

// ---------------------------------------------------------------------------
// Operator actions
// ---------------------------------------------------------------------------

/// An operator-driven status mutation.
///
/// Each action is valid from exactly the statuses listed in its match arm
/// in [`apply`](Self::apply); anything else is an
/// [`CoreError::InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Approve,
    Deny,
    Grant,
    Revoke,
    Reactivate,
}

impl RequestAction {
    /// Lowercase action name, used in error messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestAction::Approve => "approve",
            RequestAction::Deny => "deny",
            RequestAction::Grant => "grant",
            RequestAction::Revoke => "revoke",
            RequestAction::Reactivate => "reactivate",
        }
    }

    /// Compute the status this action produces from `current`.
    ///
    /// The precondition status is checked here, immediately before the
    /// caller applies the result under its write lock, so a concurrent
    /// conflicting transition surfaces as `InvalidTransition` instead of a
    /// silent overwrite.
    pub fn apply(self, current: &str) -> Result<&'static str, CoreError> {
        let next = match (self, current) {
            (RequestAction::Approve, STATUS_PENDING) => STATUS_APPROVED,
            (RequestAction::Deny, STATUS_PENDING) => STATUS_DENIED,
            (RequestAction::Grant, STATUS_APPROVED) => STATUS_GRANTED,
            (RequestAction::Revoke, STATUS_APPROVED) => STATUS_DENIED,
            (RequestAction::Revoke, STATUS_GRANTED) => STATUS_DENIED,
            (RequestAction::Reactivate, STATUS_DENIED) => STATUS_PENDING,
            _ => {
                return Err(CoreError::InvalidTransition {
                    from: current.to_string(),
                    action: self.as_str().to_string(),
                })
            }
        };
        Ok(next)
    }

    /// Whether this action clears the processing marks
    /// (`processed_at`/`processed_by`) instead of setting them.
    pub fn clears_processing_marks(self) -> bool {
        matches!(self, RequestAction::Reactivate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
