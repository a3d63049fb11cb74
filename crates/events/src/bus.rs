//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`RequestEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use tokio::sync::broadcast;

use rgate_store::AccessRequest;

// ---------------------------------------------------------------------------
// RequestEvent
// ---------------------------------------------------------------------------

/// A change to the request set.
#[derive(Debug, Clone)]
pub enum RequestEvent {
    /// A new pending request was created.
    Created(AccessRequest),
    /// A request's status changed; carries the post-update record.
    Updated(AccessRequest),
    /// A request was removed (timeout or expiry sweep).
    Removed { id: String },
    /// The whole store was cleared.
    Cleared,
}

impl RequestEvent {
    /// The id of the affected request, if the event targets a single one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            RequestEvent::Created(req) | RequestEvent::Updated(req) => Some(&req.id),
            RequestEvent::Removed { id } => Some(id),
            RequestEvent::Cleared => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers can
/// independently receive every published [`RequestEvent`]. Slow receivers
/// observe `RecvError::Lagged` and are expected to re-read current state
/// from the store.
pub struct EventBus {
    sender: broadcast::Sender<RequestEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// watchers always start from a store read, so nothing is lost.
    pub fn publish(&self, event: RequestEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
