//! The user-side flow: token entry, name submission, waiting on the
//! operator's decision.

use std::sync::Arc;

use tokio::sync::mpsc;

use rgate_core::error::CoreError;
use rgate_core::lifecycle::{STATUS_APPROVED, STATUS_DENIED, STATUS_GRANTED, STATUS_PENDING};
use rgate_core::validation::{validate_token, validate_user_name};
use rgate_events::{ApprovalChannel, RequestUpdate};
use rgate_store::{NewRequest, RequestStore, WatchGuard};

/// Where the user currently is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFlowState {
    /// Entry state: waiting for a token from the URL or QR scan.
    AwaitingToken,
    /// Token accepted; waiting for the user to enter a name.
    AwaitingName,
    /// Request submitted; waiting for operator approval.
    WaitingForApproval,
    /// Approved; waiting for the operator to grant procedure access.
    AwaitingGrant,
    /// Terminal: full access granted.
    Granted,
    /// Terminal: denied by the operator.
    Denied,
    /// Terminal: the request disappeared without a decision.
    TimedOut,
}

impl UserFlowState {
    /// Terminal states end the watch and the flow.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UserFlowState::Granted | UserFlowState::Denied | UserFlowState::TimedOut
        )
    }
}

/// Drives one user through the access flow.
///
/// Status updates arrive through the channel watch and are applied by
/// [`next_transition`](Self::next_transition); the caller decides how to
/// render each state.
pub struct UserFlow {
    store: Arc<dyn RequestStore>,
    channel: Arc<dyn ApprovalChannel>,
    state: UserFlowState,
    token: Option<String>,
    request_id: Option<String>,
    watch: Option<WatchGuard>,
    updates: Option<mpsc::UnboundedReceiver<RequestUpdate>>,
}

impl UserFlow {
    pub fn new(store: Arc<dyn RequestStore>, channel: Arc<dyn ApprovalChannel>) -> Self {
        Self {
            store,
            channel,
            state: UserFlowState::AwaitingToken,
            token: None,
            request_id: None,
            watch: None,
            updates: None,
        }
    }

    pub fn state(&self) -> UserFlowState {
        self.state
    }

    /// The submitted request's id, once one exists.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Present the entry token. On an accepted shape the flow moves to
    /// name entry; a rejected token leaves the flow where it is.
    pub fn present_token(&mut self, token: &str) -> Result<(), CoreError> {
        self.expect_state(UserFlowState::AwaitingToken)?;
        validate_token(token)?;

        self.token = Some(token.to_string());
        self.state = UserFlowState::AwaitingName;
        Ok(())
    }

    /// Validate and submit the user's name, creating the request and
    /// starting the status watch. Returns the new request id.
    pub async fn submit_name(&mut self, name: &str) -> Result<String, CoreError> {
        self.expect_state(UserFlowState::AwaitingName)?;
        let user_name = validate_user_name(name)?;

        let token = self.token.clone().unwrap_or_else(|| "direct_access".into());
        let request = self
            .store
            .create(NewRequest::new(user_name, token))
            .await?;

        tracing::info!(request_id = %request.id, "Access request submitted");

        let (tx, rx) = mpsc::unbounded_channel();
        let watch = self.channel.watch_request(
            &request.id,
            Arc::new(move |update| {
                let _ = tx.send(update);
            }),
        );

        self.request_id = Some(request.id.clone());
        self.watch = Some(watch);
        self.updates = Some(rx);
        self.state = UserFlowState::WaitingForApproval;
        Ok(request.id)
    }

    /// Wait for the next state change driven by the operator.
    ///
    /// Returns the new state, or `None` when the watch has ended (terminal
    /// state reached earlier, cancelled, or never subscribed).
    pub async fn next_transition(&mut self) -> Option<UserFlowState> {
        loop {
            let update = self.updates.as_mut()?.recv().await?;
            if self.apply_update(update) {
                return Some(self.state);
            }
        }
    }

    /// Apply one status update. Returns whether the flow state changed.
    fn apply_update(&mut self, update: RequestUpdate) -> bool {
        let next = match update {
            RequestUpdate::Status(request) => match request.status.as_str() {
                STATUS_PENDING => {
                    // Initial snapshot, or an operator reactivated the
                    // request; either way we are (still) waiting.
                    UserFlowState::WaitingForApproval
                }
                STATUS_APPROVED => UserFlowState::AwaitingGrant,
                STATUS_GRANTED => UserFlowState::Granted,
                STATUS_DENIED => UserFlowState::Denied,
                other => {
                    tracing::warn!(status = other, "Unknown status in update");
                    return false;
                }
            },
            RequestUpdate::Removed => UserFlowState::TimedOut,
        };

        if next == self.state {
            return false;
        }

        self.state = next;
        if next.is_terminal() {
            self.stop_watch();
        }
        true
    }

    /// Abandon a waiting request and return to the token screen.
    ///
    /// Only meaningful while waiting for approval or the grant; terminal
    /// and pre-submission states are unaffected.
    pub fn cancel(&mut self) {
        if !matches!(
            self.state,
            UserFlowState::WaitingForApproval | UserFlowState::AwaitingGrant
        ) {
            return;
        }

        tracing::info!(request_id = ?self.request_id, "User cancelled request");
        self.stop_watch();
        self.updates = None;
        self.request_id = None;
        self.token = None;
        self.state = UserFlowState::AwaitingToken;
    }

    fn stop_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.unsubscribe();
        }
    }

    fn expect_state(&self, expected: UserFlowState) -> Result<(), CoreError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Flow is in {:?}, expected {:?}",
                self.state, expected
            )))
        }
    }
}
