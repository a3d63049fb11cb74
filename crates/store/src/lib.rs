//! Request persistence for the access gate.
//!
//! Exposes the [`RequestStore`] contract and its backends:
//!
//! - [`MemoryStore`] — shared in-memory map with push change notification;
//!   the realtime backend used by the relay server.
//! - [`LocalStore`] — a JSON document on disk that survives restarts;
//!   subscriptions poll on a fixed interval.
//! - [`FallbackStore`] — explicit try-primary-fall-back-to-local decorator.
//!
//! Both concrete backends satisfy the identical contract, so callers pick a
//! strategy once at construction and never branch on it again.

pub mod fallback;
pub mod local;
pub mod memory;
pub mod record;
pub mod store;
pub mod subscription;

pub use fallback::FallbackStore;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use record::{AccessRequest, NewRequest, OriginInfo, StatusChange};
pub use store::{ListCallback, RequestStore};
pub use subscription::WatchGuard;
