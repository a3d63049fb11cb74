use std::sync::Arc;

use rgate_store::MemoryStore;

use crate::config::RelayConfig;
use crate::registry::ConnectionRegistry;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// The shared realtime request store.
    pub store: MemoryStore,
    /// Active WebSocket connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Relay configuration.
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            store: MemoryStore::new(),
            registry: Arc::new(ConnectionRegistry::new()),
            config: Arc::new(config),
        }
    }
}
