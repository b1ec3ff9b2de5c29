//! Generic per-category cache facade

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::entry::{format_age, CacheEntry};
use super::keys::CacheKey;
use super::persistence::SnapshotFile;
use super::policy::Category;
use super::scheduler::Sweepable;
use super::stats::{AgeSummary, CacheStats};
use super::store::EntryStore;
use crate::validation::{validate_key, ValidationError};

/// Anything the cache can hold: cloneable, shareable across tasks and
/// round-trippable through the snapshot file.
pub trait CacheValue: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Decides whether a value may be cached
pub type Validator<V> = fn(&V) -> Result<(), ValidationError>;

/// One category's cache: TTL policy, validity rule, store and snapshot file.
///
/// No method returns an error. Invalid puts are dropped, failed saves are
/// logged, and an unreadable snapshot means starting empty.
pub struct TypedCache<V> {
    category: Category,
    ttl: Duration,
    validator: Validator<V>,
    store: EntryStore<V>,
    file: SnapshotFile,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
    /// Held while snapshotting and writing, so the last save to run also
    /// carries the newest state
    save_lock: Mutex<()>,
}

impl<V: CacheValue> TypedCache<V> {
    /// Create the cache for `category` with its snapshot in `dir`, then load it
    pub async fn open(
        category: Category,
        dir: &Path,
        capacity: u64,
        validator: Validator<V>,
        clock: Arc<dyn Clock>,
        stats: Arc<CacheStats>,
    ) -> Self {
        let cache = Self {
            category,
            ttl: category.ttl(),
            validator,
            store: EntryStore::new(capacity),
            file: SnapshotFile::new(category, dir.join(category.file_name())),
            clock,
            stats,
            save_lock: Mutex::new(()),
        };
        cache.load().await;
        cache
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn file_path(&self) -> &Path {
        self.file.path()
    }

    fn key(&self, id: &str) -> Option<CacheKey> {
        CacheKey::new(self.category, id)
    }

    /// Populate the store from disk, dropping entries that are already stale.
    ///
    /// Returns the number of entries kept.
    pub async fn load(&self) -> usize {
        let loaded = match self.file.load::<V>().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "Ignoring unreadable {} cache at {}: {}",
                    self.category,
                    self.file.path().display(),
                    e
                );
                return 0;
            }
        };

        let now = self.clock.now_millis();
        let mut kept = 0;
        let mut discarded = loaded.skipped;
        for entry in loaded.entries {
            let key = match self.key(&entry.source_key) {
                Some(key) if (self.validator)(&entry.value).is_ok() => key,
                _ => {
                    discarded += 1;
                    continue;
                }
            };
            if entry.is_expired(self.ttl, now) {
                discarded += 1;
                continue;
            }
            self.store.insert(key.to_string(), entry).await;
            kept += 1;
        }

        info!(
            "Loaded {} {} entries ({} discarded)",
            kept, self.category, discarded
        );
        if discarded > 0 {
            self.save().await;
        }
        kept
    }

    /// Look up a live value. Expired entries are removed on the way out.
    pub async fn get(&self, id: &str) -> Option<V> {
        let Some(key) = self.key(id) else {
            self.stats.record_miss(self.category);
            return None;
        };
        let key = key.to_string();

        match self.store.get(&key).await {
            Some(entry) => {
                let now = self.clock.now_millis();
                if entry.is_expired(self.ttl, now) {
                    self.store.remove_if_expired(&key, self.ttl, now).await;
                    self.stats.record_miss(self.category);
                    debug!("Cache expired for key: {}", key);
                    None
                } else {
                    self.stats.record_hit(self.category);
                    debug!("Cache hit for key: {}", key);
                    Some(entry.value)
                }
            }
            None => {
                self.stats.record_miss(self.category);
                debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    /// Like [`Self::get`] but leaves the counters untouched
    pub async fn contains(&self, id: &str) -> bool {
        let Some(key) = self.key(id) else {
            return false;
        };
        match self.store.get(&key.to_string()).await {
            Some(entry) => !entry.is_expired(self.ttl, self.clock.now_millis()),
            None => false,
        }
    }

    /// Store `value`, replacing any previous entry, then persist the category.
    ///
    /// Blank ids and values rejected by the validator are dropped with a warning.
    pub async fn put(&self, id: &str, value: V) {
        if let Err(e) = validate_key(id) {
            warn!("Refusing to cache {} value: {}", self.category, e);
            return;
        }
        if let Err(e) = (self.validator)(&value) {
            warn!("Refusing to cache {} value for '{}': {}", self.category, id.trim(), e);
            return;
        }
        let Some(key) = self.key(id) else {
            return;
        };

        let entry = CacheEntry::new(value, self.clock.now_millis(), key.id());
        self.store.insert(key.to_string(), entry).await;
        debug!("Cached {}", key);
        self.save().await;
    }

    /// Drop one entry. Persists only when something was removed.
    pub async fn clear(&self, id: &str) -> bool {
        let Some(key) = self.key(id) else {
            return false;
        };
        let removed = self.store.remove(&key.to_string()).await.is_some();
        if removed {
            info!("Cleared cache for {}", key);
            self.save().await;
        }
        removed
    }

    /// Drop every entry and persist the empty category
    pub async fn clear_all(&self) -> usize {
        let removed = self.store.clear().await;
        info!("Cleared all {} entries ({})", self.category, removed);
        self.save().await;
        removed
    }

    /// Human-readable status of one key, for display only
    pub async fn info(&self, id: &str) -> String {
        let entry = match self.key(id) {
            Some(key) => self.store.get(&key.to_string()).await,
            None => None,
        };
        match entry {
            None => "No cached data".to_string(),
            Some(entry) => {
                let now = self.clock.now_millis();
                let age = format_age(entry.age_millis(now));
                if entry.is_expired(self.ttl, now) {
                    format!("Cache expired ({})", age)
                } else {
                    format!("Cached {}", age)
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Entry count, staleness and age range
    pub fn summary(&self) -> AgeSummary {
        let now = self.clock.now_millis();
        let mut summary = AgeSummary::default();
        for (_, entry) in self.store.snapshot() {
            summary.record(entry.age_minutes(now), entry.is_expired(self.ttl, now));
        }
        summary
    }

    /// Remove all expired entries, persisting if any were dropped
    pub async fn sweep(&self) -> usize {
        let removed = self
            .store
            .remove_expired(self.ttl, self.clock.now_millis())
            .await;
        if removed > 0 {
            info!("Evicted {} expired {} entries", removed, self.category);
            self.save().await;
        }
        removed
    }

    /// Write the whole category to disk. Failures are logged, never returned.
    pub async fn save(&self) {
        let _guard = self.save_lock.lock().await;
        let entries: Vec<CacheEntry<V>> = self
            .store
            .snapshot()
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();

        if let Err(e) = self.file.save(&entries, self.clock.now_millis()).await {
            error!("Failed to save {} cache: {}", self.category, e);
        }
    }
}

impl<V: CacheValue> Sweepable for TypedCache<V> {
    fn category(&self) -> Category {
        self.category
    }

    fn sweep(&self) -> BoxFuture<'_, usize> {
        Box::pin(TypedCache::sweep(self))
    }

    fn flush(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.save())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::validation::validate_positive;
    use tempfile::TempDir;

    fn positive(value: &f64) -> Result<(), ValidationError> {
        validate_positive(*value)
    }

    async fn open(dir: &TempDir, clock: Arc<ManualClock>) -> TypedCache<f64> {
        TypedCache::open(
            Category::Price,
            dir.path(),
            1_000,
            positive,
            clock,
            Arc::new(CacheStats::new()),
        )
        .await
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, Arc::new(ManualClock::new(0))).await;

        cache.put("Bitcoin", 65_000.0).await;
        assert_eq!(cache.get("bitcoin").await, Some(65_000.0));
        assert!(cache.file_path().exists());
    }

    #[tokio::test]
    async fn test_expired_entry_does_not_resurrect() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let cache = open(&dir, clock.clone()).await;

        cache.put("bitcoin", 65_000.0).await;
        clock.advance(Category::Price.ttl() + Duration::from_secs(1));

        assert_eq!(cache.get("bitcoin").await, None);
        assert_eq!(cache.get("bitcoin").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_values_are_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, Arc::new(ManualClock::new(0))).await;

        cache.put("", 100.0).await;
        cache.put("btc", -5.0).await;
        cache.put("btc", 0.0).await;

        assert!(cache.is_empty());
        assert!(!cache.file_path().exists());
    }

    #[tokio::test]
    async fn test_info_reports_age() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let cache = open(&dir, clock.clone()).await;

        assert_eq!(cache.info("bitcoin").await, "No cached data");

        cache.put("bitcoin", 1.0).await;
        clock.advance(Duration::from_secs(30));
        assert_eq!(cache.info("bitcoin").await, "Cached 30 seconds ago");

        clock.advance(Duration::from_secs(150));
        assert_eq!(cache.info("bitcoin").await, "Cache expired (3 minutes ago)");
    }

    #[tokio::test]
    async fn test_sweep_evicts_and_persists() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let cache = open(&dir, clock.clone()).await;

        cache.put("old", 1.0).await;
        clock.advance(Duration::from_secs(100));
        cache.put("new", 2.0).await;
        clock.advance(Duration::from_secs(30));

        let summary = cache.summary();
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.expired_entries, 1);
        assert_eq!(summary.oldest_age_minutes, Some(2));
        assert_eq!(summary.newest_age_minutes, Some(0));

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.sweep().await, 0);

        let reopened = open(&dir, clock).await;
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("new").await, Some(2.0));
    }
}
