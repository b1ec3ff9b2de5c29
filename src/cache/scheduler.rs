//! Background eviction of expired entries

use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::Category;

/// Shortest period the sweep loop will run at
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(10);

/// A category cache the scheduler can maintain without knowing its value type
pub trait Sweepable: Send + Sync {
    fn category(&self) -> Category;

    /// Remove expired entries, persisting if anything was removed
    fn sweep(&self) -> BoxFuture<'_, usize>;

    /// Persist the current contents unconditionally
    fn flush(&self) -> BoxFuture<'_, ()>;
}

/// Sweep every cache once and return the total number of evicted entries
pub async fn sweep_all(caches: &[Arc<dyn Sweepable>]) -> usize {
    let mut removed = 0;
    for cache in caches {
        let count = cache.sweep().await;
        if count > 0 {
            debug!("Sweep removed {} {} entries", count, cache.category());
        }
        removed += count;
    }
    removed
}

/// Persist every cache concurrently
pub async fn flush_all(caches: &[Arc<dyn Sweepable>]) {
    join_all(caches.iter().map(|cache| cache.flush())).await;
}

/// Periodically sweeps a group of caches on its own tokio task.
///
/// The task never holds a lock across a tick, so request traffic is not
/// blocked by it. Dropping the scheduler without calling [`stop`](Self::stop)
/// leaves the task to die with the runtime.
pub struct EvictionScheduler {
    name: &'static str,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EvictionScheduler {
    /// Spawn the sweep loop. The first sweep runs one `period` from now.
    ///
    /// Periods shorter than [`MIN_SWEEP_PERIOD`] are raised to it.
    pub fn start(name: &'static str, period: Duration, caches: Vec<Arc<dyn Sweepable>>) -> Self {
        if period < MIN_SWEEP_PERIOD {
            warn!(
                "{} eviction period {:?} is too short, using {:?}",
                name, period, MIN_SWEEP_PERIOD
            );
        }
        let period = period.max(MIN_SWEEP_PERIOD);
        let shutdown = CancellationToken::new();
        let task_shutdown = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("{} eviction scheduler started (every {:?})", name, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = sweep_all(&caches).await;
                        if removed > 0 {
                            info!("{} sweep evicted {} entries", name, removed);
                        } else {
                            debug!("{} sweep found nothing to evict", name);
                        }
                    }
                    _ = task_shutdown.cancelled() => {
                        info!("Shutting down {} eviction scheduler", name);
                        break;
                    }
                }
            }
        });

        Self {
            name,
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True until stopped, or until the sweep task has died on its own
    pub fn is_running(&self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        match self.handle.try_lock() {
            Ok(handle) => handle.as_ref().is_some_and(|h| !h.is_finished()),
            // Only `stop` holds the lock, and it cancels first
            Err(_) => false,
        }
    }

    /// Cancel the loop and wait for an in-flight sweep to finish. Safe to call twice.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("{} eviction scheduler ended abnormally: {}", self.name, e);
            }
        }
    }
}

impl Drop for EvictionScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCache {
        sweeps: AtomicUsize,
        flushes: AtomicUsize,
    }

    impl Sweepable for CountingCache {
        fn category(&self) -> Category {
            Category::Price
        }

        fn sweep(&self) -> BoxFuture<'_, usize> {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { 2 })
        }

        fn flush(&self) -> BoxFuture<'_, ()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    fn counting() -> Arc<CountingCache> {
        Arc::new(CountingCache {
            sweeps: AtomicUsize::new(0),
            flushes: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_until_stopped() {
        let cache = counting();
        let scheduler = EvictionScheduler::start(
            "test",
            Duration::from_secs(60),
            vec![cache.clone() as Arc<dyn Sweepable>],
        );

        // No sweep at startup
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(cache.sweeps.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(cache.sweeps.load(Ordering::SeqCst), 2);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        scheduler.stop().await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(cache.sweeps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let cache = counting();
        let scheduler = EvictionScheduler::start(
            "zero",
            Duration::ZERO,
            vec![cache.clone() as Arc<dyn Sweepable>],
        );

        tokio::time::sleep(MIN_SWEEP_PERIOD * 5 + Duration::from_millis(1)).await;
        assert!(cache.sweeps.load(Ordering::SeqCst) >= 1);
        assert!(scheduler.is_running());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_sweep_and_flush_all() {
        let a = counting();
        let b = counting();
        let caches: Vec<Arc<dyn Sweepable>> = vec![a.clone() as Arc<dyn Sweepable>, b.clone()];

        assert_eq!(sweep_all(&caches).await, 4);
        flush_all(&caches).await;

        assert_eq!(a.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(b.flushes.load(Ordering::SeqCst), 1);
    }
}
