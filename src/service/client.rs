use backon::{ExponentialBuilder, Retryable};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::MarketSnapshot;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited by price API")]
    RateLimited,

    #[error("Price API returned {0}")]
    Status(StatusCode),

    #[error("No data for coin: {0}")]
    NotFound(String),
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited => true,
            Self::Status(status) => status.is_server_error(),
            Self::NotFound(_) => false,
        }
    }
}

/// Where prices come from when the cache misses
pub trait PriceSource: Send + Sync {
    fn fetch_price(&self, coin_id: &str) -> impl Future<Output = Result<f64, SourceError>> + Send;

    fn fetch_market_snapshot(
        &self,
        coin_id: &str,
    ) -> impl Future<Output = Result<MarketSnapshot, SourceError>> + Send;
}

/// `simple/price` answers `{ "<coin>": { "usd": .., "usd_market_cap": .., ... } }`
type SimplePriceResponse = HashMap<String, CoinQuote>;

#[derive(Debug, Deserialize)]
struct CoinQuote {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_vol: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// CoinGecko public API client with a shared request budget and retries on
/// transient failures
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    limiter: DefaultDirectRateLimiter,
}

impl CoinGeckoClient {
    pub fn new(config: &Config) -> Self {
        let per_minute = NonZeroU32::new(config.price_rate_limit).unwrap_or(NonZeroU32::MIN);
        info!(
            "Initializing CoinGecko client with endpoint: {}, limit: {}/min",
            config.coingecko_api_url, per_minute
        );

        Self {
            client: Client::new(),
            base_url: config.coingecko_api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.http_timeout_secs),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }

    async fn request_quote(&self, coin_id: &str) -> Result<CoinQuote, SourceError> {
        self.limiter.until_ready().await;

        let url = format!("{}/simple/price", self.base_url);
        debug!("Fetching quote for {}", coin_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", coin_id),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimited),
            status if !status.is_success() => return Err(SourceError::Status(status)),
            _ => {}
        }

        let mut body: SimplePriceResponse = response.json().await?;
        body.remove(coin_id)
            .ok_or_else(|| SourceError::NotFound(coin_id.to_string()))
    }

    async fn quote(&self, coin_id: &str) -> Result<CoinQuote, SourceError> {
        let coin_id = coin_id.trim().to_lowercase();
        let fetch = || self.request_quote(&coin_id);

        fetch
            .retry(ExponentialBuilder::default().with_max_times(3))
            .when(|e: &SourceError| e.is_transient())
            .notify(|e: &SourceError, wait: Duration| {
                warn!("Price request for {} failed ({}), retrying in {:?}", coin_id, e, wait);
            })
            .await
    }
}

impl PriceSource for CoinGeckoClient {
    async fn fetch_price(&self, coin_id: &str) -> Result<f64, SourceError> {
        self.quote(coin_id)
            .await?
            .usd
            .ok_or_else(|| SourceError::NotFound(coin_id.to_string()))
    }

    async fn fetch_market_snapshot(&self, coin_id: &str) -> Result<MarketSnapshot, SourceError> {
        let quote = self.quote(coin_id).await?;
        let price = quote
            .usd
            .ok_or_else(|| SourceError::NotFound(coin_id.to_string()))?;

        Ok(MarketSnapshot {
            price,
            market_cap: quote.usd_market_cap.unwrap_or_default(),
            volume_24h: quote.usd_24h_vol.unwrap_or_default(),
            change_24h_pct: quote.usd_24h_change.unwrap_or_default(),
        })
    }
}
