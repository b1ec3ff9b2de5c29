//! Owner of every cache and its background maintenance

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::advice::AiResponseCache;
use super::clock::{Clock, SystemClock};
use super::market::MarketDataCache;
use super::policy::Subsystem;
use super::scheduler::{flush_all, sweep_all, EvictionScheduler, Sweepable};
use super::stats::{CacheStats, StatsSnapshot};
use crate::config::Config;

/// Opens the market and AI caches, runs one eviction scheduler per cache
/// group and flushes everything on [`close`](Self::close).
///
/// Build one at startup and hand it (usually behind an `Arc`) to whatever
/// needs caching.
pub struct CacheManager {
    market: MarketDataCache,
    ai: AiResponseCache,
    stats: Arc<CacheStats>,
    market_scheduler: EvictionScheduler,
    ai_scheduler: EvictionScheduler,
    shutdown_timeout: Duration,
    closed: AtomicBool,
}

impl CacheManager {
    /// Open all caches with the system clock. Must be called inside a tokio runtime.
    pub async fn open(config: &Config) -> Self {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let stats = Arc::new(CacheStats::new());

        let market = MarketDataCache::open(
            &config.subsystem_dir(Subsystem::Market),
            config.cache_max_capacity,
            clock.clone(),
            stats.clone(),
        )
        .await;
        let ai = AiResponseCache::open(
            &config.subsystem_dir(Subsystem::Ai),
            config.cache_max_capacity,
            clock,
            stats.clone(),
        )
        .await;

        let market_scheduler = EvictionScheduler::start(
            "market",
            config.market_sweep_interval,
            market.sweepables(),
        );
        let ai_scheduler =
            EvictionScheduler::start("ai", config.ai_sweep_interval, ai.sweepables());

        info!("Caches opened under {}", config.cache_dir.display());

        Self {
            market,
            ai,
            stats,
            market_scheduler,
            ai_scheduler,
            shutdown_timeout: config.shutdown_timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub fn market(&self) -> &MarketDataCache {
        &self.market
    }

    pub fn ai(&self) -> &AiResponseCache {
        &self.ai
    }

    /// Process-wide hit/miss counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn all_caches(&self) -> Vec<Arc<dyn Sweepable>> {
        let mut caches = self.market.sweepables();
        caches.extend(self.ai.sweepables());
        caches
    }

    /// Run one eviction pass over every category right away
    pub async fn sweep_now(&self) -> usize {
        sweep_all(&self.all_caches()).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the schedulers and write every category to disk.
    ///
    /// The whole shutdown is bounded by the configured timeout; past it the
    /// remaining work is abandoned. Only the first call does anything.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let shutdown = async {
            self.market_scheduler.stop().await;
            self.ai_scheduler.stop().await;
            flush_all(&self.all_caches()).await;
        };

        match tokio::time::timeout(self.shutdown_timeout, shutdown).await {
            Ok(()) => info!("Caches flushed and closed"),
            Err(_) => warn!(
                "Cache shutdown did not finish within {:?}, abandoning",
                self.shutdown_timeout
            ),
        }
    }
}
