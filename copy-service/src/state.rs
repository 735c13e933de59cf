//! Application state for copy service.

use common::config::AppConfig;
use common::db::Connector;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub connector: Connector,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            connector: Connector::from_config(&config),
            config,
        }
    }
}
