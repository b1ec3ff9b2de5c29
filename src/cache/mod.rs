pub mod advice;
pub mod clock;
pub mod entry;
pub mod keys;
pub mod manager;
pub mod market;
pub mod persistence;
pub mod policy;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod typed;

pub use advice::AiResponseCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{format_age, CacheEntry};
pub use keys::CacheKey;
pub use manager::CacheManager;
pub use market::{MarketCacheStats, MarketDataCache};
pub use policy::{Category, Subsystem};
pub use scheduler::{EvictionScheduler, Sweepable, MIN_SWEEP_PERIOD};
pub use stats::{AgeSummary, CacheStats, StatsSnapshot};
pub use typed::{CacheValue, TypedCache};
