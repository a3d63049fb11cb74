//! Try-primary, fall-back-to-local store decorator.
//!
//! The policy the dashboard used to express with exception-driven control
//! flow lives here explicitly: every operation goes to the primary backend
//! until a transport failure occurs, after which the store degrades to the
//! local document. The degradation is logged and exposed through
//! [`degraded`](FallbackStore::degraded) so callers can surface it; no
//! write is ever silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use rgate_core::error::CoreError;

use crate::local::LocalStore;
use crate::record::{AccessRequest, NewRequest, StatusChange};
use crate::store::{ListCallback, RequestStore};
use crate::subscription::WatchGuard;

pub struct FallbackStore<P: RequestStore> {
    primary: P,
    local: LocalStore,
    degraded: AtomicBool,
}

impl<P: RequestStore> FallbackStore<P> {
    pub fn new(primary: P, local: LocalStore) -> Self {
        Self {
            primary,
            local,
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the store has switched to the local backend.
    pub fn degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn mark_degraded(&self, error: &CoreError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                error = %error,
                "Primary store unreachable, falling back to local store"
            );
        }
    }

    /// Route the outcome of a primary-store call: transport failures flip
    /// the degraded flag and signal the caller to retry locally.
    fn should_retry_locally(&self, error: &CoreError) -> bool {
        if error.is_transport() {
            self.mark_degraded(error);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<P: RequestStore> RequestStore for FallbackStore<P> {
    async fn create(&self, new: NewRequest) -> Result<AccessRequest, CoreError> {
        if self.degraded() {
            return self.local.create(new).await;
        }
        match self.primary.create(new.clone()).await {
            Ok(request) => Ok(request),
            Err(e) if self.should_retry_locally(&e) => self.local.create(new).await,
            Err(e) => Err(e),
        }
    }

    async fn get(&self, id: &str) -> Result<AccessRequest, CoreError> {
        if self.degraded() {
            return self.local.get(id).await;
        }
        match self.primary.get(id).await {
            Ok(request) => Ok(request),
            Err(e) if self.should_retry_locally(&e) => self.local.get(id).await,
            Err(e) => Err(e),
        }
    }

    async fn list_for_operator(&self) -> Result<Vec<AccessRequest>, CoreError> {
        if self.degraded() {
            return self.local.list_for_operator().await;
        }
        match self.primary.list_for_operator().await {
            Ok(list) => Ok(list),
            Err(e) if self.should_retry_locally(&e) => self.local.list_for_operator().await,
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: &str, change: StatusChange) -> Result<AccessRequest, CoreError> {
        if self.degraded() {
            return self.local.update(id, change).await;
        }
        match self.primary.update(id, change.clone()).await {
            Ok(request) => Ok(request),
            Err(e) if self.should_retry_locally(&e) => self.local.update(id, change).await,
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        if self.degraded() {
            return self.local.remove(id).await;
        }
        match self.primary.remove(id).await {
            Ok(removed) => Ok(removed),
            Err(e) if self.should_retry_locally(&e) => self.local.remove(id).await,
            Err(e) => Err(e),
        }
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        if self.degraded() {
            return self.local.clear_all().await;
        }
        match self.primary.clear_all().await {
            Ok(()) => Ok(()),
            Err(e) if self.should_retry_locally(&e) => self.local.clear_all().await,
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self, callback: ListCallback) -> WatchGuard {
        if self.degraded() {
            self.local.subscribe(callback)
        } else {
            self.primary.subscribe(callback)
        }
    }
}
