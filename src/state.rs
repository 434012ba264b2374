//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;

/// Shared application state, cloneable across handlers.
///
/// Holds only immutable configuration and the connection factory; no
/// connection outlives the request that opened it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = Store::new(config.database.clone());
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
