//! Shared relay state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chalkline_core::config::Config;

use crate::access::{AllowAll, JoinGate};
use crate::registry::RoomRegistry;

/// State shared by all connections and handlers.
pub struct RelayState {
    pub config: Arc<Config>,
    pub registry: RoomRegistry,
    pub gate: Arc<dyn JoinGate>,
    connections: AtomicUsize,
}

impl RelayState {
    pub fn new(config: Arc<Config>, gate: Arc<dyn JoinGate>) -> Self {
        Self {
            config,
            registry: RoomRegistry::new(),
            gate,
            connections: AtomicUsize::new(0),
        }
    }

    /// State with defaults and an open gate, as used by the public canvas
    /// deployment and by tests.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(Config::default()), Arc::new(AllowAll))
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of live WebSocket connections (joined or not).
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}
