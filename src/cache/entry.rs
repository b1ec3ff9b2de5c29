//! Cached values and their age

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the moment it was stored.
///
/// Entries never change once created; writing the same key again replaces the
/// whole entry. Expiry is not stored, it is evaluated against the category's
/// current TTL whenever the entry is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at_millis: i64,
    /// Normalized identifier the value was cached under, without the category suffix
    pub source_key: String,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, created_at_millis: i64, source_key: impl Into<String>) -> Self {
        Self {
            value,
            created_at_millis,
            source_key: source_key.into(),
        }
    }

    /// Milliseconds since creation. Clamped at zero if the clock went backwards.
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        (now_millis - self.created_at_millis).max(0)
    }

    /// True once the entry is strictly older than `ttl`
    pub fn is_expired(&self, ttl: Duration, now_millis: i64) -> bool {
        self.age_millis(now_millis) > ttl.as_millis() as i64
    }

    pub fn age_minutes(&self, now_millis: i64) -> i64 {
        self.age_millis(now_millis) / 60_000
    }
}

/// Coarse human-readable age, e.g. "42 seconds ago" or "3 hours ago"
pub fn format_age(age_millis: i64) -> String {
    let seconds = age_millis.max(0) / 1000;
    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else {
        format!("{} hours ago", seconds / 3600)
    }
}
