//! The operator-side session: login, dashboard watch, request processing.

use std::sync::Arc;

use rgate_core::error::CoreError;
use rgate_core::lifecycle::RequestAction;
use rgate_core::operators::operator_for_code;
use rgate_events::ApprovalChannel;
use rgate_store::store::ListCallback;
use rgate_store::{AccessRequest, RequestStore, StatusChange, WatchGuard};

/// An authenticated-in-name-only operator session.
///
/// The code lookup yields an identity label for `processed_by`; it is not
/// a credential. Every action delegates to the store, which enforces the
/// transition rules.
pub struct OperatorSession {
    store: Arc<dyn RequestStore>,
    channel: Arc<dyn ApprovalChannel>,
    operator: &'static str,
}

impl std::fmt::Debug for OperatorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorSession")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl OperatorSession {
    /// Open a session for the given operator code.
    pub fn login(
        store: Arc<dyn RequestStore>,
        channel: Arc<dyn ApprovalChannel>,
        code: &str,
    ) -> Result<Self, CoreError> {
        let operator = operator_for_code(code)
            .ok_or_else(|| CoreError::Validation("Invalid operator code".into()))?;

        tracing::info!(operator, "Operator logged in");
        Ok(Self {
            store,
            channel,
            operator,
        })
    }

    /// Identity label recorded on processed requests.
    pub fn operator(&self) -> &'static str {
        self.operator
    }

    /// Current dashboard list.
    pub async fn list(&self) -> Result<Vec<AccessRequest>, CoreError> {
        self.store.list_for_operator().await
    }

    /// Watch the dashboard list for changes.
    pub fn watch(&self, on_update: ListCallback) -> WatchGuard {
        self.channel.watch_all(on_update)
    }

    pub async fn approve(&self, request_id: &str) -> Result<AccessRequest, CoreError> {
        self.process(request_id, RequestAction::Approve).await
    }

    pub async fn deny(&self, request_id: &str) -> Result<AccessRequest, CoreError> {
        self.process(request_id, RequestAction::Deny).await
    }

    pub async fn grant(&self, request_id: &str) -> Result<AccessRequest, CoreError> {
        self.process(request_id, RequestAction::Grant).await
    }

    pub async fn revoke(&self, request_id: &str) -> Result<AccessRequest, CoreError> {
        self.process(request_id, RequestAction::Revoke).await
    }

    pub async fn reactivate(&self, request_id: &str) -> Result<AccessRequest, CoreError> {
        self.process(request_id, RequestAction::Reactivate).await
    }

    /// Drop every request. Irreversible; confirmation is the UI's concern.
    pub async fn clear_all(&self) -> Result<(), CoreError> {
        tracing::warn!(operator = self.operator, "Clearing all requests");
        self.store.clear_all().await
    }

    async fn process(
        &self,
        request_id: &str,
        action: RequestAction,
    ) -> Result<AccessRequest, CoreError> {
        let result = self
            .store
            .update(request_id, StatusChange::new(action, self.operator))
            .await;

        match &result {
            Ok(request) => {
                tracing::info!(
                    request_id,
                    operator = self.operator,
                    action = action.as_str(),
                    status = %request.status,
                    "Request processed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    request_id,
                    operator = self.operator,
                    action = action.as_str(),
                    error = %e,
                    "Request processing failed"
                );
            }
        }

        result
    }
}
