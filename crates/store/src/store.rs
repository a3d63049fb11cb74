//! The storage contract shared by every backend.

use std::sync::Arc;

use async_trait::async_trait;

use rgate_core::error::CoreError;

use crate::record::{AccessRequest, NewRequest, StatusChange};
use crate::subscription::WatchGuard;

/// Callback receiving the fresh operator list on every delivery.
pub type ListCallback = Arc<dyn Fn(Vec<AccessRequest>) + Send + Sync>;

/// Persistence contract for request records.
///
/// Both backends satisfy this identically; callers select one at
/// construction (optionally wrapped in
/// [`FallbackStore`](crate::FallbackStore)) and never branch on the choice
/// again.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a new pending request. Fails with
    /// [`CoreError::DuplicateId`] on an id collision.
    async fn create(&self, new: NewRequest) -> Result<AccessRequest, CoreError>;

    /// Fetch one request by id.
    async fn get(&self, id: &str) -> Result<AccessRequest, CoreError>;

    /// Requests needing operator attention: all pending/approved/granted,
    /// plus recently denied (see
    /// [`visible_to_operator`](AccessRequest::visible_to_operator)),
    /// newest first.
    async fn list_for_operator(&self) -> Result<Vec<AccessRequest>, CoreError>;

    /// Apply a status change atomically relative to other updates on the
    /// same id. The current status is re-read under the write lock, so a
    /// stale precondition yields [`CoreError::InvalidTransition`] and the
    /// record stays unchanged.
    async fn update(&self, id: &str, change: StatusChange) -> Result<AccessRequest, CoreError>;

    /// Remove a single request (timeout/expiry sweeps). Returns whether a
    /// record was actually removed.
    async fn remove(&self, id: &str) -> Result<bool, CoreError>;

    /// Empty the store. Irreversible.
    async fn clear_all(&self) -> Result<(), CoreError>;

    /// Deliver the current operator list whenever the underlying data
    /// changes (push backends) or on a fixed interval (poll backends).
    /// Dropping or unsubscribing the returned guard stops all further
    /// callbacks and releases the backing task.
    fn subscribe(&self, callback: ListCallback) -> WatchGuard;
}
