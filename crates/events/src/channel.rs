//! The approval channel: delivering status changes to watchers.
//!
//! Two implementations behind one trait. [`PushChannel`] rides the
//! [`EventBus`] for low-latency delivery; [`PollChannel`] re-reads the
//! store on a fixed interval for backends without change notification.
//! Either way, delivery is at-least-once: duplicates of the same status
//! are possible, missed terminal transitions are not.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use rgate_core::error::CoreError;
use rgate_store::store::ListCallback;
use rgate_store::{AccessRequest, RequestStore, WatchGuard};

use crate::bus::{EventBus, RequestEvent};

/// Default poll cadence for a single watched request.
pub const DEFAULT_REQUEST_POLL: Duration = Duration::from_secs(2);
/// Default poll cadence for the operator list.
pub const DEFAULT_LIST_POLL: Duration = Duration::from_secs(3);

/// A delivery to a request watcher.
#[derive(Debug, Clone)]
pub enum RequestUpdate {
    /// Current record state (after a status change, or the initial
    /// snapshot when the watch starts).
    Status(AccessRequest),
    /// The watched request no longer exists — timeout sweep or clear.
    Removed,
}

/// Callback receiving updates for a single watched request.
pub type UpdateCallback = Arc<dyn Fn(RequestUpdate) + Send + Sync>;

/// Realtime delivery of request changes.
pub trait ApprovalChannel: Send + Sync {
    /// Watch one request. The callback fires with the record's state when
    /// the watch starts and on every subsequent status change, and with
    /// [`RequestUpdate::Removed`] if the record disappears.
    fn watch_request(&self, id: &str, on_update: UpdateCallback) -> WatchGuard;

    /// Watch the operator list. The callback receives the fresh
    /// `list_for_operator()` result on every store mutation (push) or on a
    /// fixed interval (poll).
    fn watch_all(&self, on_update: ListCallback) -> WatchGuard;
}

// ---------------------------------------------------------------------------
// PushChannel
// ---------------------------------------------------------------------------

/// Event-driven channel over the [`EventBus`].
///
/// Lagged receivers recover by re-reading the store, so a slow watcher can
/// skip intermediate states but never misses a terminal one.
pub struct PushChannel {
    bus: Arc<EventBus>,
    store: Arc<dyn RequestStore>,
}

impl PushChannel {
    pub fn new(bus: Arc<EventBus>, store: Arc<dyn RequestStore>) -> Self {
        Self { bus, store }
    }
}

impl ApprovalChannel for PushChannel {
    fn watch_request(&self, id: &str, on_update: UpdateCallback) -> WatchGuard {
        let id = id.to_string();
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let store = Arc::clone(&self.store);
        let mut events = self.bus.subscribe();

        let task = tokio::spawn(async move {
            let deliver = |update: RequestUpdate| {
                if flag.load(Ordering::SeqCst) {
                    on_update(update);
                    true
                } else {
                    false
                }
            };

            // Initial snapshot: a transition that happened before the watch
            // started must still reach the watcher.
            match store.get(&id).await {
                Ok(req) => {
                    if !deliver(RequestUpdate::Status(req)) {
                        return;
                    }
                }
                Err(CoreError::NotFound { .. }) => {}
                Err(e) => tracing::warn!(request_id = %id, error = %e, "Watch snapshot failed"),
            }

            loop {
                match events.recv().await {
                    Ok(RequestEvent::Created(req)) | Ok(RequestEvent::Updated(req))
                        if req.id == id =>
                    {
                        if !deliver(RequestUpdate::Status(req)) {
                            break;
                        }
                    }
                    Ok(RequestEvent::Removed { id: removed }) if removed == id => {
                        deliver(RequestUpdate::Removed);
                        break;
                    }
                    Ok(RequestEvent::Cleared) => {
                        deliver(RequestUpdate::Removed);
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(request_id = %id, skipped = n, "Request watcher lagged");
                        // Recover from the store so no terminal state is lost.
                        match store.get(&id).await {
                            Ok(req) => {
                                if !deliver(RequestUpdate::Status(req)) {
                                    break;
                                }
                            }
                            Err(CoreError::NotFound { .. }) => {
                                deliver(RequestUpdate::Removed);
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(request_id = %id, error = %e, "Watch re-read failed")
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        WatchGuard::new(active).with_task(task)
    }

    fn watch_all(&self, on_update: ListCallback) -> WatchGuard {
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let store = Arc::clone(&self.store);
        let mut events = self.bus.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match store.list_for_operator().await {
                    Ok(list) => {
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        on_update(list);
                    }
                    Err(e) => tracing::warn!(error = %e, "Operator list read failed"),
                }

                match events.recv().await {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Operator list watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        WatchGuard::new(active).with_task(task)
    }
}

// ---------------------------------------------------------------------------
// PollChannel
// ---------------------------------------------------------------------------

/// Interval-driven channel over any [`RequestStore`].
///
/// Single-request watches only fire when the observed status actually
/// changes; list watches deliver every tick. Read errors are logged and
/// polling continues — a background interval never propagates a failure.
pub struct PollChannel {
    store: Arc<dyn RequestStore>,
    request_interval: Duration,
    list_interval: Duration,
}

impl PollChannel {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self {
            store,
            request_interval: DEFAULT_REQUEST_POLL,
            list_interval: DEFAULT_LIST_POLL,
        }
    }

    /// Override both poll cadences (mainly for tests).
    pub fn with_intervals(mut self, request: Duration, list: Duration) -> Self {
        self.request_interval = request;
        self.list_interval = list;
        self
    }
}

impl ApprovalChannel for PollChannel {
    fn watch_request(&self, id: &str, on_update: UpdateCallback) -> WatchGuard {
        let id = id.to_string();
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let store = Arc::clone(&self.store);
        let poll = self.request_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            let mut last_status: Option<String> = None;

            loop {
                interval.tick().await;
                match store.get(&id).await {
                    Ok(req) => {
                        if last_status.as_deref() == Some(req.status.as_str()) {
                            continue;
                        }
                        last_status = Some(req.status.clone());
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        on_update(RequestUpdate::Status(req));
                    }
                    Err(CoreError::NotFound { .. }) => {
                        if flag.load(Ordering::SeqCst) {
                            on_update(RequestUpdate::Removed);
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(request_id = %id, error = %e, "Request poll failed");
                    }
                }
            }
        });

        WatchGuard::new(active).with_task(task)
    }

    fn watch_all(&self, on_update: ListCallback) -> WatchGuard {
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let store = Arc::clone(&self.store);
        let poll = self.list_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            loop {
                interval.tick().await;
                match store.list_for_operator().await {
                    Ok(list) => {
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        on_update(list);
                    }
                    Err(e) => tracing::warn!(error = %e, "Operator list poll failed"),
                }
            }
        });

        WatchGuard::new(active).with_task(task)
    }
}
