//! Cache categories and their fixed expiry policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Price data moves fast, so it is only trusted for two minutes
pub const PRICE_TTL: Duration = Duration::from_secs(2 * 60);
pub const VOLUME_TTL: Duration = Duration::from_secs(5 * 60);
pub const MARKET_DATA_TTL: Duration = Duration::from_secs(15 * 60);
pub const OHLC_TTL: Duration = Duration::from_secs(30 * 60);
/// Generated advice and analysis text is reused for half a day
pub const AI_TEXT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Which group of caches a category belongs to. Each subsystem gets its own
/// eviction scheduler and cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Market,
    Ai,
}

/// An independent cache partition for one kind of external data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Price,
    Volume,
    MarketData,
    Ohlc,
    AiAdvice,
    AiAnalysis,
}

impl Category {
    pub const COUNT: usize = 6;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Price,
        Category::Volume,
        Category::MarketData,
        Category::Ohlc,
        Category::AiAdvice,
        Category::AiAnalysis,
    ];

    /// Maximum age before an entry of this category is treated as absent
    pub fn ttl(self) -> Duration {
        match self {
            Self::Price => PRICE_TTL,
            Self::Volume => VOLUME_TTL,
            Self::MarketData => MARKET_DATA_TTL,
            Self::Ohlc => OHLC_TTL,
            Self::AiAdvice | Self::AiAnalysis => AI_TEXT_TTL,
        }
    }

    /// Discriminator appended to normalized identifiers
    pub fn key_suffix(self) -> &'static str {
        match self {
            Self::Price => "_price",
            Self::Volume => "_volume",
            Self::MarketData => "_market",
            Self::Ohlc => "_ohlc",
            Self::AiAdvice => "_advice",
            Self::AiAnalysis => "_analysis",
        }
    }

    /// Name of the snapshot file inside the subsystem's directory
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Price => "price_cache.dat",
            Self::Volume => "volume_cache.dat",
            Self::MarketData => "market_data_cache.dat",
            Self::Ohlc => "ohlc_cache.dat",
            Self::AiAdvice => "ai_responses.dat",
            Self::AiAnalysis => "ai_analysis.dat",
        }
    }

    pub fn subsystem(self) -> Subsystem {
        match self {
            Self::Price | Self::Volume | Self::MarketData | Self::Ohlc => Subsystem::Market,
            Self::AiAdvice | Self::AiAnalysis => Subsystem::Ai,
        }
    }

    /// Stable position used to index per-category counters
    pub fn index(self) -> usize {
        match self {
            Self::Price => 0,
            Self::Volume => 1,
            Self::MarketData => 2,
            Self::Ohlc => 3,
            Self::AiAdvice => 4,
            Self::AiAnalysis => 5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Price => "price",
            Self::Volume => "volume",
            Self::MarketData => "market_data",
            Self::Ohlc => "ohlc",
            Self::AiAdvice => "ai_advice",
            Self::AiAnalysis => "ai_analysis",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_volatile_data_expires_first() {
        assert!(Category::Price.ttl() < Category::Volume.ttl());
        assert!(Category::Volume.ttl() < Category::MarketData.ttl());
        assert!(Category::MarketData.ttl() < Category::Ohlc.ttl());
        assert!(Category::Ohlc.ttl() < Category::AiAdvice.ttl());
        assert_eq!(Category::AiAdvice.ttl(), Duration::from_secs(43_200));
    }

    #[test]
    fn test_categories_do_not_share_files_or_slots() {
        let files: HashSet<_> = Category::ALL.iter().map(|c| c.file_name()).collect();
        let suffixes: HashSet<_> = Category::ALL.iter().map(|c| c.key_suffix()).collect();
        let slots: HashSet<_> = Category::ALL.iter().map(|c| c.index()).collect();

        assert_eq!(files.len(), Category::COUNT);
        assert_eq!(suffixes.len(), Category::COUNT);
        assert_eq!(slots.len(), Category::COUNT);
        assert!(slots.iter().all(|i| *i < Category::COUNT));
    }

    #[test]
    fn test_subsystem_grouping() {
        let ai: Vec<_> = Category::ALL
            .iter()
            .filter(|c| c.subsystem() == Subsystem::Ai)
            .collect();
        assert_eq!(ai, vec![&Category::AiAdvice, &Category::AiAnalysis]);
        assert_eq!(Category::Ohlc.subsystem(), Subsystem::Market);
    }
}
