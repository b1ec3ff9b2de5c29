//! Market data cache: prices, volumes, market overviews and OHLC history

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::clock::Clock;
use super::policy::Category;
use super::scheduler::Sweepable;
use super::stats::CacheStats;
use super::typed::TypedCache;
use crate::models::{validate_candles, Candle, MarketSnapshot};
use crate::validation::{validate_positive, ValidationError};

fn positive(value: &f64) -> Result<(), ValidationError> {
    validate_positive(*value)
}

fn valid_snapshot(value: &MarketSnapshot) -> Result<(), ValidationError> {
    value.validate()
}

#[allow(clippy::ptr_arg)]
fn valid_series(value: &Vec<Candle>) -> Result<(), ValidationError> {
    validate_candles(value)
}

/// Hit/miss counters for the market categories plus their current sizes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketCacheStats {
    pub total_requests: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub price_entries: usize,
    pub volume_entries: usize,
    pub market_data_entries: usize,
    pub ohlc_entries: usize,
}

/// Caches everything fetched from the market data API, one category per data kind
pub struct MarketDataCache {
    price: Arc<TypedCache<f64>>,
    volume: Arc<TypedCache<f64>>,
    market_data: Arc<TypedCache<MarketSnapshot>>,
    ohlc: Arc<TypedCache<Vec<Candle>>>,
    stats: Arc<CacheStats>,
}

impl MarketDataCache {
    /// Open all market categories under `dir`, loading their snapshots
    pub async fn open(
        dir: &Path,
        capacity: u64,
        clock: Arc<dyn Clock>,
        stats: Arc<CacheStats>,
    ) -> Self {
        let price = TypedCache::open(
            Category::Price,
            dir,
            capacity,
            positive,
            clock.clone(),
            stats.clone(),
        )
        .await;
        let volume = TypedCache::open(
            Category::Volume,
            dir,
            capacity,
            positive,
            clock.clone(),
            stats.clone(),
        )
        .await;
        let market_data = TypedCache::open(
            Category::MarketData,
            dir,
            capacity,
            valid_snapshot,
            clock.clone(),
            stats.clone(),
        )
        .await;
        let ohlc = TypedCache::open(
            Category::Ohlc,
            dir,
            capacity,
            valid_series,
            clock,
            stats.clone(),
        )
        .await;

        Self {
            price: Arc::new(price),
            volume: Arc::new(volume),
            market_data: Arc::new(market_data),
            ohlc: Arc::new(ohlc),
            stats,
        }
    }

    /// The categories in the form the eviction scheduler wants them
    pub fn sweepables(&self) -> Vec<Arc<dyn Sweepable>> {
        vec![
            self.price.clone() as Arc<dyn Sweepable>,
            self.volume.clone(),
            self.market_data.clone(),
            self.ohlc.clone(),
        ]
    }

    pub async fn cache_price(&self, coin_id: &str, price: f64) {
        self.price.put(coin_id, price).await;
    }

    pub async fn get_cached_price(&self, coin_id: &str) -> Option<f64> {
        self.price.get(coin_id).await
    }

    pub async fn cache_volume(&self, coin_id: &str, volume: f64) {
        self.volume.put(coin_id, volume).await;
    }

    pub async fn get_cached_volume(&self, coin_id: &str) -> Option<f64> {
        self.volume.get(coin_id).await
    }

    pub async fn cache_market_data(&self, coin_id: &str, snapshot: MarketSnapshot) {
        self.market_data.put(coin_id, snapshot).await;
    }

    pub async fn get_cached_market_data(&self, coin_id: &str) -> Option<MarketSnapshot> {
        self.market_data.get(coin_id).await
    }

    pub async fn cache_ohlc(&self, coin_id: &str, candles: Vec<Candle>) {
        self.ohlc.put(coin_id, candles).await;
    }

    pub async fn get_cached_ohlc(&self, coin_id: &str) -> Option<Vec<Candle>> {
        self.ohlc.get(coin_id).await
    }

    /// Forget everything cached for one coin, e.g. on a manual refresh
    pub async fn clear_coin(&self, coin_id: &str) -> usize {
        let cleared = [
            self.price.clear(coin_id).await,
            self.volume.clear(coin_id).await,
            self.market_data.clear(coin_id).await,
            self.ohlc.clear(coin_id).await,
        ];
        cleared.iter().filter(|removed| **removed).count()
    }

    pub async fn clear_all(&self) {
        self.price.clear_all().await;
        self.volume.clear_all().await;
        self.market_data.clear_all().await;
        self.ohlc.clear_all().await;
        info!("Cleared all market data caches");
    }

    /// Status of the cached price for display
    pub async fn info(&self, coin_id: &str) -> String {
        self.price.info(coin_id).await
    }

    pub fn price_cache(&self) -> &TypedCache<f64> {
        &self.price
    }

    pub fn volume_cache(&self) -> &TypedCache<f64> {
        &self.volume
    }

    pub fn market_data_cache(&self) -> &TypedCache<MarketSnapshot> {
        &self.market_data
    }

    pub fn ohlc_cache(&self) -> &TypedCache<Vec<Candle>> {
        &self.ohlc
    }

    pub fn stats(&self) -> MarketCacheStats {
        let counts: Vec<_> = [
            Category::Price,
            Category::Volume,
            Category::MarketData,
            Category::Ohlc,
        ]
        .into_iter()
            .map(|category| self.stats.category(category))
            .collect();
        let total_hits: u64 = counts.iter().map(|c| c.hits).sum();
        let total_misses: u64 = counts.iter().map(|c| c.misses).sum();

        MarketCacheStats {
            total_requests: total_hits + total_misses,
            total_hits,
            total_misses,
            price_entries: self.price.len(),
            volume_entries: self.volume.len(),
            market_data_entries: self.market_data.len(),
            ohlc_entries: self.ohlc.len(),
        }
    }
}
