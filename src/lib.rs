pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use cache::{AiResponseCache, CacheManager, Category, MarketDataCache, TypedCache};
pub use error::CacheError;
pub use models::{Candle, MarketSnapshot};
pub use validation::ValidationError;
