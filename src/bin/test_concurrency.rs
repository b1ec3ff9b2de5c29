use portfolio_cache::{
    cache::{CacheManager, ManualClock},
    config::Config,
};
use std::{sync::Arc, time::{Duration, Instant}};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting cache concurrency and background eviction checks...");

    // Setup: private cache directory and a clock we can push forward
    let cache_dir = std::env::temp_dir()
        .join(format!("portfolio-cache-smoke-{}", std::process::id()));
    let config = Config {
        cache_dir: cache_dir.clone(),
        market_sweep_interval: Duration::from_millis(200),
        ai_sweep_interval: Duration::from_millis(200),
        ..Config::default()
    };
    let clock = Arc::new(ManualClock::starting_now());
    let caches = Arc::new(CacheManager::open_with_clock(&config, clock.clone()).await);

    // Test 1: Concurrent writers
    info!("Test 1: {} tasks writing prices and advice at once", 100);
    let started = Instant::now();
    let writers: Vec<_> = (0..100)
        .map(|i| {
            let caches = caches.clone();
            tokio::spawn(async move {
                let coin = format!("coin-{}", i);
                caches.market().cache_price(&coin, 1.0 + i as f64).await;
                caches.ai().cache_response(&coin, "Hold And Wait").await;
            })
        })
        .collect();
    for writer in writers {
        writer.await?;
    }
    info!("Writes finished in {:?}", started.elapsed());

    // Test 2: Concurrent readers see every write
    info!("Test 2: Reading everything back concurrently");
    let readers: Vec<_> = (0..100)
        .map(|i| {
            let caches = caches.clone();
            tokio::spawn(async move {
                let coin = format!("COIN-{}", i);
                caches.market().get_cached_price(&coin).await == Some(1.0 + i as f64)
                    && caches.ai().get_cached_response(&coin).await.is_some()
            })
        })
        .collect();
    for reader in readers {
        assert!(reader.await?, "Every written key should be a hit");
    }
    let stats = caches.stats();
    assert_eq!(stats.total_hits, 200);
    assert_eq!(stats.total_misses, 0);
    info!("✅ Concurrent access test passed ({} hits)", stats.total_hits);

    // Test 3: Background sweep evicts stale prices without any reads
    info!("Test 3: Background eviction");
    clock.advance(Duration::from_secs(5 * 60));
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(caches.market().stats().price_entries, 0, "Stale prices should be evicted");
    assert_eq!(caches.ai().stats().total_entries, 100, "Advice should still be live");
    info!("✅ Background eviction test passed");

    // Test 4: Restart restores what is still live
    info!("Test 4: Restart");
    caches.close().await;
    let reopened = CacheManager::open_with_clock(&config, clock.clone()).await;
    assert_eq!(reopened.ai().stats().total_entries, 100);
    assert_eq!(reopened.market().stats().price_entries, 0);
    reopened.close().await;
    info!("✅ Restart test passed");

    std::fs::remove_dir_all(&cache_dir)?;
    info!("All cache checks passed");
    Ok(())
}
