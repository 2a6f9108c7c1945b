// =============================================================================
// Application State
// =============================================================================
//
// Immutable per-process dependencies handed to every handler: the loaded
// configuration and the market-data provider. Nothing here is mutated after
// startup, so requests share no mutable state.
// =============================================================================

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::market_data::PriceProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub provider: Arc<dyn PriceProvider>,
}

impl AppState {
    pub fn new(config: ServerConfig, provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}
