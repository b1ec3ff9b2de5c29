//! Concurrent in-memory entry store backed by Moka

use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::time::Duration;
use tracing::debug;

use super::entry::CacheEntry;

/// Live key → entry mapping for one category.
///
/// Moka handles the synchronization, so callers on any task can read and
/// write without holding a lock. Moka's own TTL is left off: expiry depends on
/// the entry's creation time, which survives restarts, not on insertion time.
#[derive(Clone)]
pub struct EntryStore<V> {
    cache: Cache<String, CacheEntry<V>>,
}

impl<V> EntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store holding at most `capacity` entries
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity).build();
        Self { cache }
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.cache.get(key).await
    }

    /// Store `entry` under `key`, replacing whatever was there
    pub async fn insert(&self, key: String, entry: CacheEntry<V>) {
        self.cache.insert(key, entry).await;
    }

    pub async fn remove(&self, key: &str) -> Option<CacheEntry<V>> {
        self.cache.remove(key).await
    }

    /// Atomically remove the entry under `key` if it has outlived `ttl`.
    ///
    /// A fresh entry written by another task between the caller's read and
    /// this call is left alone.
    pub async fn remove_if_expired(&self, key: &str, ttl: Duration, now_millis: i64) -> bool {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().is_expired(ttl, now_millis) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        matches!(result, CompResult::Removed(_))
    }

    /// Remove every expired entry and return how many were dropped.
    ///
    /// Keys are collected from a point-in-time iteration and then removed one
    /// by one with [`Self::remove_if_expired`], so entries refreshed during the
    /// sweep survive.
    pub async fn remove_expired(&self, ttl: Duration, now_millis: i64) -> usize {
        let stale: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl, now_millis))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        let mut removed = 0;
        for key in stale {
            if self.remove_if_expired(&key, ttl, now_millis).await {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Removed {} expired entries", removed);
        }
        removed
    }

    /// Copy of every entry currently held
    pub fn snapshot(&self) -> Vec<(String, CacheEntry<V>)> {
        self.cache
            .iter()
            .map(|(key, entry)| (key.as_ref().clone(), entry))
            .collect()
    }

    /// Remove everything and return how many entries were dropped
    pub async fn clear(&self) -> usize {
        let keys: Vec<String> = self.cache.iter().map(|(key, _)| key.as_ref().clone()).collect();
        let mut removed = 0;
        for key in keys {
            if self.cache.remove(&key).await.is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_insert_replaces_previous_entry() {
        let store = EntryStore::new(100);
        store.insert("btc_price".into(), CacheEntry::new(1.0, 0, "btc")).await;
        store.insert("btc_price".into(), CacheEntry::new(2.0, 5, "btc")).await;

        let entry = store.get("btc_price").await.unwrap();
        assert_eq!(entry.value, 2.0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_if_expired_keeps_fresh_entries() {
        let store = EntryStore::new(100);
        store.insert("fresh".into(), CacheEntry::new(1.0, 100_000, "fresh")).await;
        store.insert("stale".into(), CacheEntry::new(1.0, 0, "stale")).await;

        let now = 100_000;
        assert!(!store.remove_if_expired("fresh", TTL, now).await);
        assert!(store.remove_if_expired("stale", TTL, now).await);
        assert!(!store.remove_if_expired("stale", TTL, now).await);
        assert!(!store.remove_if_expired("missing", TTL, now).await);

        assert!(store.get("fresh").await.is_some());
        assert!(store.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_expired_and_clear() {
        let store = EntryStore::new(100);
        for i in 0..10 {
            // Even entries are old, odd entries are recent
            let created = if i % 2 == 0 { 0 } else { 200_000 };
            store.insert(format!("k{}", i), CacheEntry::new(i, created, format!("k{}", i))).await;
        }

        assert_eq!(store.remove_expired(TTL, 200_000).await, 5);
        assert_eq!(store.len(), 5);
        assert_eq!(store.clear().await, 5);
        assert!(store.is_empty());
    }
}
