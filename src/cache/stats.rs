//! Hit/miss counters and age summaries

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::policy::Category;

#[derive(Debug, Default)]
struct CategoryCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Process-lifetime request counters, shared by every cache opened by one
/// manager. Counters only grow; they are not persisted.
#[derive(Debug, Default)]
pub struct CacheStats {
    total_requests: AtomicU64,
    total_hits: AtomicU64,
    total_misses: AtomicU64,
    categories: [CategoryCounters; Category::COUNT],
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, category: Category) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_hits.fetch_add(1, Ordering::Relaxed);
        self.categories[category.index()].hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, category: Category) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_misses.fetch_add(1, Ordering::Relaxed);
        self.categories[category.index()].misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_misses: self.total_misses.load(Ordering::Relaxed),
            categories: Category::ALL
                .iter()
                .map(|category| self.category(*category))
                .collect(),
        }
    }

    pub fn category(&self, category: Category) -> CategoryCounts {
        let counters = &self.categories[category.index()];
        CategoryCounts {
            category,
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub category: Category,
    pub hits: u64,
    pub misses: u64,
}

impl CategoryCounts {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub categories: Vec<CategoryCounts>,
}

impl StatsSnapshot {
    /// Fraction of requests served from cache, 0.0 before the first request
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_hits as f64 / self.total_requests as f64
        }
    }
}

/// Size and age of the entries held for one or more categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AgeSummary {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub oldest_age_minutes: Option<i64>,
    pub newest_age_minutes: Option<i64>,
}

impl AgeSummary {
    /// Fold one entry's age into the summary
    pub fn record(&mut self, age_minutes: i64, expired: bool) {
        self.total_entries += 1;
        if expired {
            self.expired_entries += 1;
        }
        self.oldest_age_minutes = Some(
            self.oldest_age_minutes
                .map_or(age_minutes, |a| a.max(age_minutes)),
        );
        self.newest_age_minutes = Some(
            self.newest_age_minutes
                .map_or(age_minutes, |a| a.min(age_minutes)),
        );
    }

    pub fn merge(self, other: AgeSummary) -> AgeSummary {
        let pick = |a: Option<i64>, b: Option<i64>, f: fn(i64, i64) -> i64| match (a, b) {
            (Some(a), Some(b)) => Some(f(a, b)),
            (a, b) => a.or(b),
        };
        AgeSummary {
            total_entries: self.total_entries + other.total_entries,
            expired_entries: self.expired_entries + other.expired_entries,
            oldest_age_minutes: pick(self.oldest_age_minutes, other.oldest_age_minutes, i64::max),
            newest_age_minutes: pick(self.newest_age_minutes, other.newest_age_minutes, i64::min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_requests() {
        let stats = CacheStats::new();
        stats.record_hit(Category::Price);
        stats.record_hit(Category::AiAdvice);
        stats.record_miss(Category::Price);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.total_hits, 2);
        assert_eq!(snapshot.total_misses, 1);
        assert!((snapshot.hit_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);

        let price = stats.category(Category::Price);
        assert_eq!((price.hits, price.misses, price.requests()), (1, 1, 2));
        assert_eq!(stats.category(Category::Ohlc).requests(), 0);
    }

    #[test]
    fn test_empty_hit_ratio_is_zero() {
        assert_eq!(CacheStats::new().snapshot().hit_ratio(), 0.0);
    }

    #[test]
    fn test_age_summary_merge() {
        let mut a = AgeSummary::default();
        a.record(5, false);
        a.record(30, true);

        let mut b = AgeSummary::default();
        b.record(1, false);

        let merged = a.merge(b).merge(AgeSummary::default());
        assert_eq!(merged.total_entries, 3);
        assert_eq!(merged.expired_entries, 1);
        assert_eq!(merged.oldest_age_minutes, Some(30));
        assert_eq!(merged.newest_age_minutes, Some(1));
    }
}
