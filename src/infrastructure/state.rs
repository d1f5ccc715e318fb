//! Shared application state

use tokio::sync::RwLock;

use crate::infrastructure::config::RelayConfig;
use crate::infrastructure::relay::RelayHub;

/// State shared by every connection handler.
pub struct AppState {
    pub config: RelayConfig,
    pub relay: RwLock<RelayHub>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let relay = RwLock::new(RelayHub::new(config.max_connections));
        Self { config, relay }
    }
}
