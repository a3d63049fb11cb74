//! Periodic cleanup of expired and abandoned requests.
//!
//! Runs every few minutes and removes:
//! - requests whose attached access code has expired, and
//! - pending requests that waited longer than the configured timeout
//!   without any operator action.
//!
//! Errors are logged and the loop continues; the sweep never takes the
//! relay down.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use rgate_core::lifecycle::STATUS_PENDING;
use rgate_core::types::Timestamp;
use rgate_store::{AccessRequest, MemoryStore, RequestStore};

/// Whether the sweep should drop this record.
fn should_remove(request: &AccessRequest, now: Timestamp, pending_timeout: chrono::Duration) -> bool {
    if request.code_expired(now) {
        return true;
    }
    request.status == STATUS_PENDING && now - request.timestamp > pending_timeout
}

/// Run one sweep pass. Returns the number of requests removed.
pub async fn sweep_once(store: &MemoryStore, pending_timeout_mins: i64) -> usize {
    let now = Utc::now();
    let pending_timeout = chrono::Duration::minutes(pending_timeout_mins);
    let mut removed = 0;

    for request in store.all().await {
        if !should_remove(&request, now, pending_timeout) {
            continue;
        }
        match store.remove(&request.id).await {
            Ok(true) => {
                removed += 1;
                tracing::info!(
                    request_id = %request.id,
                    status = %request.status,
                    "Swept request"
                );
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "Sweep removal failed");
            }
        }
    }

    removed
}

/// Spawn the background sweeper.
///
/// Ticks every `sweep_interval_secs`; exits when `cancel` fires.
pub fn spawn_sweeper(
    store: MemoryStore,
    sweep_interval_secs: u64,
    pending_timeout_mins: i64,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs));
        // The first tick fires immediately; skip it so a fresh start does
        // not race request submission.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let removed = sweep_once(&store, pending_timeout_mins).await;
                    if removed > 0 {
                        tracing::info!(removed, "Sweep pass complete");
                    }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rgate_core::lifecycle::RequestAction;
    use rgate_store::{NewRequest, StatusChange};

    #[tokio::test]
    async fn fresh_pending_request_survives() {
        let store = MemoryStore::new();
        store
            .create(NewRequest::new("Jane Doe", "test123"))
            .await
            .unwrap();

        let removed = sweep_once(&store, 10).await;
        assert_eq!(removed, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn timed_out_pending_request_is_removed() {
        let store = MemoryStore::new();
        store
            .create(NewRequest::new("Jane Doe", "test123"))
            .await
            .unwrap();

        // A zero-minute timeout makes any pending request overdue.
        let removed = sweep_once(&store, 0).await;
        assert_eq!(removed, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_code_is_removed_but_live_code_survives() {
        let store = MemoryStore::new();

        let expired = store
            .create(NewRequest::new("Jane Doe", "test123"))
            .await
            .unwrap();
        store
            .update(
                &expired.id,
                StatusChange::new(RequestAction::Approve, "gcc_admin")
                    .with_access_code("111111", Utc::now() - chrono::Duration::minutes(1)),
            )
            .await
            .unwrap();

        let live = store
            .create(NewRequest::new("Ben Okri", "test123"))
            .await
            .unwrap();
        store
            .update(
                &live.id,
                StatusChange::new(RequestAction::Approve, "gcc_admin")
                    .with_access_code("222222", Utc::now() + chrono::Duration::minutes(30)),
            )
            .await
            .unwrap();

        let removed = sweep_once(&store, 10).await;
        assert_eq!(removed, 1);
        assert!(store.get(&expired.id).await.is_err());
        assert!(store.get(&live.id).await.is_ok());
    }

    #[tokio::test]
    async fn approved_without_code_is_kept() {
        let store = MemoryStore::new();
        let req = store
            .create(NewRequest::new("Jane Doe", "test123"))
            .await
            .unwrap();
        store
            .update(&req.id, StatusChange::new(RequestAction::Approve, "gcc_admin"))
            .await
            .unwrap();

        // Zero pending timeout, but the request is no longer pending.
        let removed = sweep_once(&store, 0).await;
        assert_eq!(removed, 0);
    }
}
