//! Realtime delivery for request status changes.
//!
//! Building blocks:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying [`RequestEvent`]s.
//! - [`PublishingStore`] — store decorator that publishes an event after
//!   every successful mutation, so channels see changes without the store
//!   backends knowing about the bus.
//! - [`ApprovalChannel`] — the watch contract, with a push implementation
//!   ([`PushChannel`]) over the bus and a poll implementation
//!   ([`PollChannel`]) over any store.

pub mod bus;
pub mod channel;
pub mod publishing;

pub use bus::{EventBus, RequestEvent};
pub use channel::{ApprovalChannel, PollChannel, PushChannel, RequestUpdate, UpdateCallback};
pub use publishing::PublishingStore;
