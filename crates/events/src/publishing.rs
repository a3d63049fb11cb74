//! Store decorator that announces every successful mutation on the bus.

use std::sync::Arc;

use async_trait::async_trait;

use rgate_core::error::CoreError;
use rgate_store::store::ListCallback;
use rgate_store::{AccessRequest, NewRequest, RequestStore, StatusChange, WatchGuard};

use crate::bus::{EventBus, RequestEvent};

/// Wraps any [`RequestStore`] and publishes a [`RequestEvent`] after each
/// successful mutation, leaving the store itself bus-agnostic. Reads and
/// subscriptions pass straight through.
pub struct PublishingStore<S: RequestStore> {
    inner: S,
    bus: Arc<EventBus>,
}

impl<S: RequestStore> PublishingStore<S> {
    pub fn new(inner: S, bus: Arc<EventBus>) -> Self {
        Self { inner, bus }
    }

    /// The bus this store publishes to.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

#[async_trait]
impl<S: RequestStore> RequestStore for PublishingStore<S> {
    async fn create(&self, new: NewRequest) -> Result<AccessRequest, CoreError> {
        let request = self.inner.create(new).await?;
        self.bus.publish(RequestEvent::Created(request.clone()));
        Ok(request)
    }

    async fn get(&self, id: &str) -> Result<AccessRequest, CoreError> {
        self.inner.get(id).await
    }

    async fn list_for_operator(&self) -> Result<Vec<AccessRequest>, CoreError> {
        self.inner.list_for_operator().await
    }

    async fn update(&self, id: &str, change: StatusChange) -> Result<AccessRequest, CoreError> {
        let request = self.inner.update(id, change).await?;
        self.bus.publish(RequestEvent::Updated(request.clone()));
        Ok(request)
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let removed = self.inner.remove(id).await?;
        if removed {
            self.bus.publish(RequestEvent::Removed { id: id.to_string() });
        }
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        self.inner.clear_all().await?;
        self.bus.publish(RequestEvent::Cleared);
        Ok(())
    }

    fn subscribe(&self, callback: ListCallback) -> WatchGuard {
        self.inner.subscribe(callback)
    }
}
