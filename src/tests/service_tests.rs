//! tests/service_tests.rs - Fetch-on-miss through the price service

use crate::{
    cache::{CacheManager, ManualClock},
    config::Config,
    models::MarketSnapshot,
    service::{PriceService, PriceSource, SourceError},
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tempfile::TempDir;

/// Price source that answers from a fixed price and counts calls
struct FakeSource {
    price: Option<f64>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new(price: Option<f64>) -> Self {
        Self {
            price,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PriceSource for FakeSource {
    async fn fetch_price(&self, coin_id: &str) -> Result<f64, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.price.ok_or_else(|| SourceError::NotFound(coin_id.to_string()))
    }

    async fn fetch_market_snapshot(&self, coin_id: &str) -> Result<MarketSnapshot, SourceError> {
        let price = self.fetch_price(coin_id).await?;
        Ok(MarketSnapshot {
            price,
            market_cap: price * 1_000.0,
            volume_24h: 5_000.0,
            change_24h_pct: 0.5,
        })
    }
}

async fn setup(dir: &TempDir, price: Option<f64>) -> (PriceService<FakeSource>, Arc<ManualClock>) {
    let config = Config {
        cache_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let clock = Arc::new(ManualClock::starting_now());
    let caches = Arc::new(CacheManager::open_with_clock(&config, clock.clone()).await);
    (PriceService::new(FakeSource::new(price), caches), clock)
}

#[tokio::test]
async fn test_miss_fetches_then_hit_serves_from_cache() {
    let dir = TempDir::new().unwrap();
    let (service, clock) = setup(&dir, Some(65_000.0)).await;

    assert_eq!(service.price("bitcoin").await, Some(65_000.0));
    assert_eq!(service.price("Bitcoin").await, Some(65_000.0));
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(121));
    assert_eq!(service.price("bitcoin").await, Some(65_000.0));
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 2);

    let stats = service.caches().stats();
    assert_eq!((stats.total_hits, stats.total_misses), (1, 2));
}

#[tokio::test]
async fn test_failed_fetch_caches_nothing() {
    let dir = TempDir::new().unwrap();
    let (service, _) = setup(&dir, None).await;

    assert_eq!(service.price("unknown-coin").await, None);
    assert_eq!(service.price("unknown-coin").await, None);
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.caches().market().stats().price_entries, 0);
}

#[tokio::test]
async fn test_market_snapshot_fills_price_and_volume() {
    let dir = TempDir::new().unwrap();
    let (service, _) = setup(&dir, Some(3_000.0)).await;

    let snapshot = service.market_snapshot("ethereum").await.unwrap();
    assert_eq!(snapshot.price, 3_000.0);
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 1);

    // Everything below is served from cache
    assert_eq!(service.price("ethereum").await, Some(3_000.0));
    assert_eq!(service.market_snapshot("ethereum").await, Some(snapshot));
    assert_eq!(
        service.caches().market().get_cached_volume("ethereum").await,
        Some(5_000.0)
    );
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let dir = TempDir::new().unwrap();
    let (service, _) = setup(&dir, Some(150.0)).await;

    service.price("solana").await;
    assert_eq!(service.refresh("solana").await, Some(150.0));
    assert_eq!(service.source().calls.load(Ordering::SeqCst), 2);
}
