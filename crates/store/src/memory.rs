//! Shared in-memory backend with push change notification.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};

use rgate_core::error::CoreError;

use crate::record::{sort_for_operator, AccessRequest, NewRequest, StatusChange};
use crate::store::{ListCallback, RequestStore};
use crate::subscription::WatchGuard;

/// Buffer capacity for the change-notification channel. Subscribers that
/// lag recompute the full list on the next signal anyway, so dropped
/// signals only coalesce deliveries.
const CHANGE_CAPACITY: usize = 64;

struct Inner {
    requests: RwLock<HashMap<String, AccessRequest>>,
    changed: broadcast::Sender<()>,
}

/// The realtime store: one shared map, mutations serialized by an async
/// `RwLock`, subscribers notified on every change.
///
/// Cheaply cloneable; all clones share the same map. This is the backend
/// the relay server hands to every session.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changed, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                requests: RwLock::new(HashMap::new()),
                changed,
            }),
        }
    }

    /// Number of live records, visible or not.
    pub async fn len(&self) -> usize {
        self.inner.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.requests.read().await.is_empty()
    }

    /// Snapshot of every record, regardless of dashboard visibility.
    /// Used by the sweep and by `validate_code`'s linear scan.
    pub async fn all(&self) -> Vec<AccessRequest> {
        self.inner.requests.read().await.values().cloned().collect()
    }

    fn notify(&self) {
        // Zero receivers is fine; the signal is only a wake-up.
        let _ = self.inner.changed.send(());
    }

    async fn operator_list(inner: &Inner) -> Vec<AccessRequest> {
        let now = Utc::now();
        let mut list: Vec<AccessRequest> = inner
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.visible_to_operator(now))
            .cloned()
            .collect();
        sort_for_operator(&mut list);
        list
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create(&self, new: NewRequest) -> Result<AccessRequest, CoreError> {
        let request = new.into_request();
        {
            let mut requests = self.inner.requests.write().await;
            if requests.contains_key(&request.id) {
                return Err(CoreError::DuplicateId {
                    id: request.id.clone(),
                });
            }
            requests.insert(request.id.clone(), request.clone());
        }
        self.notify();
        Ok(request)
    }

    async fn get(&self, id: &str) -> Result<AccessRequest, CoreError> {
        self.inner
            .requests
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    async fn list_for_operator(&self) -> Result<Vec<AccessRequest>, CoreError> {
        Ok(Self::operator_list(&self.inner).await)
    }

    async fn update(&self, id: &str, change: StatusChange) -> Result<AccessRequest, CoreError> {
        let updated = {
            let mut requests = self.inner.requests.write().await;
            let request = requests
                .get_mut(id)
                .ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
            change.apply_to(request, Utc::now())?;
            request.clone()
        };
        self.notify();
        Ok(updated)
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let removed = self.inner.requests.write().await.remove(id).is_some();
        if removed {
            self.notify();
        }
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        self.inner.requests.write().await.clear();
        self.notify();
        Ok(())
    }

    fn subscribe(&self, callback: ListCallback) -> WatchGuard {
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let inner = Arc::clone(&self.inner);
        let mut changed = self.inner.changed.subscribe();

        let task = tokio::spawn(async move {
            // Initial delivery so the dashboard starts populated.
            let list = MemoryStore::operator_list(&inner).await;
            if !flag.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            callback(list);

            loop {
                match changed.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let list = MemoryStore::operator_list(&inner).await;
                        if !flag.load(std::sync::atomic::Ordering::SeqCst) {
                            break;
                        }
                        callback(list);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        WatchGuard::new(active).with_task(task)
    }
}
