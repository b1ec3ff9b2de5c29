use std::sync::Arc;
use tracing::{debug, warn};

use super::client::PriceSource;
use crate::cache::CacheManager;
use crate::models::MarketSnapshot;

/// Serves prices from the cache and falls back to the price source on a miss.
///
/// The cache itself never fetches. This is the caller-side half of the
/// pattern: look up, fetch on miss, then store what came back.
pub struct PriceService<S> {
    source: S,
    caches: Arc<CacheManager>,
}

impl<S: PriceSource> PriceService<S> {
    pub fn new(source: S, caches: Arc<CacheManager>) -> Self {
        Self { source, caches }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn caches(&self) -> &CacheManager {
        &self.caches
    }

    /// Current USD price, or `None` if it is neither cached nor fetchable
    pub async fn price(&self, coin_id: &str) -> Option<f64> {
        let market = self.caches.market();
        if let Some(price) = market.get_cached_price(coin_id).await {
            return Some(price);
        }

        match self.source.fetch_price(coin_id).await {
            Ok(price) => {
                debug!("Fetched price for {}: {}", coin_id, price);
                market.cache_price(coin_id, price).await;
                Some(price)
            }
            Err(e) => {
                warn!("Failed to fetch price for {}: {}", coin_id, e);
                None
            }
        }
    }

    /// Market overview for a coin. A fresh fetch also refreshes the cached price and volume.
    pub async fn market_snapshot(&self, coin_id: &str) -> Option<MarketSnapshot> {
        let market = self.caches.market();
        if let Some(snapshot) = market.get_cached_market_data(coin_id).await {
            return Some(snapshot);
        }

        match self.source.fetch_market_snapshot(coin_id).await {
            Ok(snapshot) => {
                market.cache_price(coin_id, snapshot.price).await;
                market.cache_volume(coin_id, snapshot.volume_24h).await;
                market.cache_market_data(coin_id, snapshot.clone()).await;
                Some(snapshot)
            }
            Err(e) => {
                warn!("Failed to fetch market data for {}: {}", coin_id, e);
                None
            }
        }
    }

    /// Drop everything cached for `coin_id` and fetch its price again
    pub async fn refresh(&self, coin_id: &str) -> Option<f64> {
        self.caches.market().clear_coin(coin_id).await;
        self.price(coin_id).await
    }
}
