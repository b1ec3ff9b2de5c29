pub mod client;
pub mod price;

// Re-exports for convenience
pub use client::{CoinGeckoClient, PriceSource, SourceError};
pub use price::PriceService;
