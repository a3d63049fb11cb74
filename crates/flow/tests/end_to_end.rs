//! End-to-end controller tests over the realtime store and push channel.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use rgate_core::error::CoreError;
use rgate_events::{ApprovalChannel, EventBus, PublishingStore, PushChannel};
use rgate_flow::{OperatorSession, UserFlow, UserFlowState};
use rgate_store::{AccessRequest, MemoryStore, RequestStore};

fn setup() -> (Arc<dyn RequestStore>, Arc<dyn ApprovalChannel>) {
    let bus = Arc::new(EventBus::default());
    let store: Arc<dyn RequestStore> =
        Arc::new(PublishingStore::new(MemoryStore::new(), Arc::clone(&bus)));
    let channel: Arc<dyn ApprovalChannel> =
        Arc::new(PushChannel::new(bus, Arc::clone(&store)));
    (store, channel)
}

fn operator(
    store: &Arc<dyn RequestStore>,
    channel: &Arc<dyn ApprovalChannel>,
) -> OperatorSession {
    OperatorSession::login(Arc::clone(store), Arc::clone(channel), "gcc2024").unwrap()
}

async fn next_state(flow: &mut UserFlow) -> UserFlowState {
    tokio::time::timeout(Duration::from_secs(1), flow.next_transition())
        .await
        .expect("transition within timeout")
        .expect("watch still active")
}

// ---------------------------------------------------------------------------
// Test: the full happy path, granted delivered exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jane_doe_is_approved_then_granted() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(Arc::clone(&store), Arc::clone(&channel));

    flow.present_token("gcc_access_2024").unwrap();
    assert_eq!(flow.state(), UserFlowState::AwaitingName);

    let request_id = flow.submit_name("Jane Doe").await.unwrap();
    assert_eq!(flow.state(), UserFlowState::WaitingForApproval);

    // The store shows exactly one pending record.
    let list = store.list_for_operator().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, "pending");
    assert_eq!(list[0].user_name, "Jane Doe");

    let op = operator(&store, &channel);

    op.approve(&request_id).await.unwrap();
    assert_eq!(next_state(&mut flow).await, UserFlowState::AwaitingGrant);

    let approved = store.get(&request_id).await.unwrap();
    assert_eq!(approved.status, "approved");
    assert!(approved.processed_at.is_some());
    assert_eq!(approved.processed_by.as_deref(), Some("gcc_admin"));

    op.grant(&request_id).await.unwrap();
    assert_eq!(next_state(&mut flow).await, UserFlowState::Granted);

    // Terminal: the watch is closed, nothing more arrives — granted was
    // delivered exactly once.
    let after = tokio::time::timeout(Duration::from_millis(200), flow.next_transition()).await;
    assert!(matches!(after, Ok(None)) || after.is_err());
}

// ---------------------------------------------------------------------------
// Test: denial is terminal for the user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn denied_request_ends_the_flow() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(Arc::clone(&store), Arc::clone(&channel));

    flow.present_token("gcc_access_2024").unwrap();
    let request_id = flow.submit_name("Jane Doe").await.unwrap();

    operator(&store, &channel).deny(&request_id).await.unwrap();
    assert_eq!(next_state(&mut flow).await, UserFlowState::Denied);
}

// ---------------------------------------------------------------------------
// Test: token and name gates hold the flow in place
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_token_keeps_awaiting_token() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(store, channel);

    for bad in ["short", "<script>", ""] {
        let err = flow.present_token(bad).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert_eq!(flow.state(), UserFlowState::AwaitingToken);
    }

    flow.present_token("gcc_access_2024").unwrap();
    assert_eq!(flow.state(), UserFlowState::AwaitingName);
}

#[tokio::test]
async fn rejected_name_keeps_awaiting_name() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(Arc::clone(&store), channel);

    flow.present_token("gcc_access_2024").unwrap();

    let fifty_one = "a".repeat(51);
    for bad in ["", "A", fifty_one.as_str(), "Test123"] {
        assert!(flow.submit_name(bad).await.is_err());
        assert_eq!(flow.state(), UserFlowState::AwaitingName);
    }

    // Nothing was created along the way.
    assert!(store.list_for_operator().await.unwrap().is_empty());

    flow.submit_name("Mary-Anne O'Brien").await.unwrap();
    assert_eq!(flow.state(), UserFlowState::WaitingForApproval);
}

// ---------------------------------------------------------------------------
// Test: cancel returns to the token screen and silences the watch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_while_waiting_resets_and_silences() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(Arc::clone(&store), Arc::clone(&channel));

    flow.present_token("gcc_access_2024").unwrap();
    let request_id = flow.submit_name("Jane Doe").await.unwrap();

    flow.cancel();
    assert_eq!(flow.state(), UserFlowState::AwaitingToken);
    assert_eq!(flow.request_id(), None);

    // A later operator decision no longer reaches the flow.
    operator(&store, &channel).approve(&request_id).await.unwrap();
    let after = tokio::time::timeout(Duration::from_millis(200), flow.next_transition()).await;
    assert!(matches!(after, Ok(None)) || after.is_err());
}

// ---------------------------------------------------------------------------
// Test: a swept request surfaces as a timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn removed_request_times_out_the_flow() {
    let (store, channel) = setup();
    let mut flow = UserFlow::new(Arc::clone(&store), channel);

    flow.present_token("gcc_access_2024").unwrap();
    let request_id = flow.submit_name("Jane Doe").await.unwrap();

    store.remove(&request_id).await.unwrap();
    assert_eq!(next_state(&mut flow).await, UserFlowState::TimedOut);
}

// ---------------------------------------------------------------------------
// Test: operator login gate and identity label
// ---------------------------------------------------------------------------

#[tokio::test]
async fn operator_login_checks_the_allow_list() {
    let (store, channel) = setup();

    let err =
        OperatorSession::login(Arc::clone(&store), Arc::clone(&channel), "letmein").unwrap_err();
    assert_matches!(err, CoreError::Validation(_));

    let session = OperatorSession::login(store, channel, "operator123").unwrap();
    assert_eq!(session.operator(), "main_operator");
}

// ---------------------------------------------------------------------------
// Test: revoke and reactivate round out the transition table
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revoke_and_reactivate() {
    let (store, channel) = setup();
    let op = operator(&store, &channel);

    let request = store
        .create(rgate_store::NewRequest::new("Jane Doe", "test123"))
        .await
        .unwrap();

    op.approve(&request.id).await.unwrap();
    op.grant(&request.id).await.unwrap();

    let revoked = op.revoke(&request.id).await.unwrap();
    assert_eq!(revoked.status, "denied");

    let reactivated = op.reactivate(&request.id).await.unwrap();
    assert_eq!(reactivated.status, "pending");
    assert!(reactivated.processed_at.is_none());
    assert!(reactivated.processed_by.is_none());
}

// ---------------------------------------------------------------------------
// Test: out-of-order actions are invalid transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grant_before_approve_is_invalid() {
    let (store, channel) = setup();
    let op = operator(&store, &channel);

    let request = store
        .create(rgate_store::NewRequest::new("Jane Doe", "test123"))
        .await
        .unwrap();

    let err = op.grant(&request.id).await.unwrap_err();
    assert_matches!(err, CoreError::InvalidTransition { .. });

    // Untouched by the failed attempt.
    assert_eq!(store.get(&request.id).await.unwrap().status, "pending");
}

// ---------------------------------------------------------------------------
// Test: the dashboard watch follows operator actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_watch_sees_processing() {
    let (store, channel) = setup();
    let op = operator(&store, &channel);

    let request = store
        .create(rgate_store::NewRequest::new("Jane Doe", "test123"))
        .await
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<AccessRequest>>();
    let guard = op.watch(Arc::new(move |list| {
        let _ = tx.send(list);
    }));

    // Initial list: one pending request.
    let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].status, "pending");

    op.approve(&request.id).await.unwrap();
    let updated = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated[0].status, "approved");

    guard.unsubscribe();
    op.clear_all().await.unwrap();
    let after = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(after.is_err() || after.unwrap().is_none());
}
