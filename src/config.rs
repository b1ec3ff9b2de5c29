// Configuration for:
// - Cache directory and per-category capacity
// - Eviction sweep periods for the market and AI caches
// - Shutdown flush timeout
// - Price API endpoint, timeout and rate limit

use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::Subsystem;

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub cache_max_capacity: u64,
    pub market_sweep_interval: Duration,
    pub ai_sweep_interval: Duration,
    pub shutdown_timeout: Duration,
    pub coingecko_api_url: String,
    pub http_timeout_secs: u64,
    pub price_rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            cache_max_capacity: 10_000,
            market_sweep_interval: Duration::from_secs(300),
            ai_sweep_interval: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(5),
            coingecko_api_url: "https://api.coingecko.com/api/v3".to_string(),
            http_timeout_secs: 10,
            price_rate_limit: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let cache_max_capacity = env::var("CACHE_MAX_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_max_capacity);
        let market_sweep_interval = sweep_period(env::var("MARKET_SWEEP_INTERVAL_SECS").ok())
            .unwrap_or(defaults.market_sweep_interval);
        let ai_sweep_interval = sweep_period(env::var("AI_SWEEP_INTERVAL_SECS").ok())
            .unwrap_or(defaults.ai_sweep_interval);
        let shutdown_timeout = env::var("SHUTDOWN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_timeout);
        let coingecko_api_url = env::var("COINGECKO_API_URL").unwrap_or(defaults.coingecko_api_url);
        let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(defaults.http_timeout_secs))
            .unwrap_or(defaults.http_timeout_secs);
        let price_rate_limit = env::var("PRICE_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.price_rate_limit);

        Self {
            cache_dir,
            cache_max_capacity,
            market_sweep_interval,
            ai_sweep_interval,
            shutdown_timeout,
            coingecko_api_url,
            http_timeout_secs,
            price_rate_limit,
        }
    }

    /// Directory holding the snapshot files of one cache group
    pub fn subsystem_dir(&self, subsystem: Subsystem) -> PathBuf {
        match subsystem {
            Subsystem::Ai => self.cache_dir.clone(),
            Subsystem::Market => self.cache_dir.join("coingecko"),
        }
    }
}

/// A sweep period in whole seconds. Zero and unparseable values are ignored.
fn sweep_period(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
