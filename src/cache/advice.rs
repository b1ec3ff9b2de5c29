//! AI response cache: short advice phrases and longer analyses per coin

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::clock::Clock;
use super::policy::Category;
use super::scheduler::Sweepable;
use super::stats::{AgeSummary, CacheStats};
use super::typed::TypedCache;
use crate::validation::{validate_text, ValidationError};

#[allow(clippy::ptr_arg)]
fn non_empty(value: &String) -> Result<(), ValidationError> {
    validate_text(value)
}

/// Caches generated text so the same symbol is not sent to the AI endpoint
/// more than once per TTL window. Symbols are matched case-insensitively.
pub struct AiResponseCache {
    advice: Arc<TypedCache<String>>,
    analysis: Arc<TypedCache<String>>,
}

impl AiResponseCache {
    pub async fn open(
        dir: &Path,
        capacity: u64,
        clock: Arc<dyn Clock>,
        stats: Arc<CacheStats>,
    ) -> Self {
        let advice = TypedCache::open(
            Category::AiAdvice,
            dir,
            capacity,
            non_empty,
            clock.clone(),
            stats.clone(),
        )
        .await;
        let analysis = TypedCache::open(
            Category::AiAnalysis,
            dir,
            capacity,
            non_empty,
            clock,
            stats,
        )
        .await;

        Self {
            advice: Arc::new(advice),
            analysis: Arc::new(analysis),
        }
    }

    pub fn sweepables(&self) -> Vec<Arc<dyn Sweepable>> {
        vec![self.advice.clone() as Arc<dyn Sweepable>, self.analysis.clone()]
    }

    pub async fn cache_response(&self, symbol: &str, advice: impl Into<String>) {
        self.advice.put(symbol, advice.into()).await;
    }

    pub async fn get_cached_response(&self, symbol: &str) -> Option<String> {
        self.advice.get(symbol).await
    }

    /// Whether live advice exists for `symbol`. Does not count as a request.
    pub async fn has_cached_response(&self, symbol: &str) -> bool {
        self.advice.contains(symbol).await
    }

    /// Drop the advice and analysis for one symbol
    pub async fn clear_cache(&self, symbol: &str) -> bool {
        let advice = self.advice.clear(symbol).await;
        let analysis = self.analysis.clear(symbol).await;
        advice || analysis
    }

    pub async fn cache_analysis(&self, symbol: &str, analysis: impl Into<String>) {
        self.analysis.put(symbol, analysis.into()).await;
    }

    pub async fn get_cached_analysis(&self, symbol: &str) -> Option<String> {
        self.analysis.get(symbol).await
    }

    pub async fn clear_all(&self) {
        self.advice.clear_all().await;
        self.analysis.clear_all().await;
        info!("Cleared all AI response caches");
    }

    pub async fn info(&self, symbol: &str) -> String {
        self.advice.info(symbol).await
    }

    pub fn advice_cache(&self) -> &TypedCache<String> {
        &self.advice
    }

    pub fn analysis_cache(&self) -> &TypedCache<String> {
        &self.analysis
    }

    /// Entry counts and age range across advice and analysis
    pub fn stats(&self) -> AgeSummary {
        self.advice.summary().merge(self.analysis.summary())
    }
}
