use crate::cache::CacheManager;
use crate::config::Config;
use crate::service::{CoinGeckoClient, PriceService};
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub caches: Arc<CacheManager>,
    pub prices: PriceService<CoinGeckoClient>,
}

impl AppState {
    pub fn new(config: Config, caches: Arc<CacheManager>) -> Self {
        let prices = PriceService::new(CoinGeckoClient::new(&config), caches.clone());
        Self {
            config,
            caches,
            prices,
        }
    }
}
