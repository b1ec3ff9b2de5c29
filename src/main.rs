// Initialize logging
// Load configuration
// Open caches (loads snapshots, starts eviction schedulers)
// Refresh watched coin prices until Ctrl-C or SIGTERM
// Flush caches before exit

use portfolio_cache::{cache::CacheManager, config::Config, state::AppState};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_WATCHLIST: [&str; 2] = ["bitcoin", "ethereum"];
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting portfolio-cache");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let caches = Arc::new(CacheManager::open(&config).await);
    let state = Arc::new(AppState::new(config, caches.clone()));

    let mut watchlist: Vec<String> = std::env::args().skip(1).collect();
    if watchlist.is_empty() {
        watchlist = DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect();
    }

    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for coin in &watchlist {
                    match state.prices.price(coin).await {
                        Some(price) => info!(
                            "{}: ${:.2} ({})",
                            coin,
                            price,
                            state.caches.market().info(coin).await
                        ),
                        None => warn!("{}: price unavailable", coin),
                    }
                }
                let stats = state.caches.stats();
                info!(
                    "Cache requests: {}, hits: {}, misses: {} ({:.0}% hit ratio)",
                    stats.total_requests,
                    stats.total_hits,
                    stats.total_misses,
                    stats.hit_ratio() * 100.0
                );
            }
            signal_name = &mut shutdown => {
                info!("Shutdown requested ({})", signal_name);
                break;
            }
        }
    }

    caches.close().await;
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where available
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                }
            }
            Err(e) => {
                warn!("Failed to bind SIGTERM: {}", e);
                ctrl_c.await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        "CTRL_C"
    }
}
