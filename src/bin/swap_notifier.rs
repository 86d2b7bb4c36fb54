//! Swap notifier runtime
//!
//! - Loads (or creates) the JSON state file
//! - Spawns the reconcile scheduler and, optionally, the state file watcher
//! - Runs until CTRL+C
//!
//! Usage:
//!   cargo run --release --bin swap_notifier
//!
//! Environment variables:
//!   SWAP_GRAPH_URL - Subgraph endpoint
//!   SWAP_STATE_PATH - State file (default: app_config.json)
//!   SWAP_POLL_INTERVAL_MS - Reconcile tick (default: 1000)
//!   SWAP_FETCH_BACKOFF_MS / SWAP_FETCH_BACKOFF_MAX_MS - Delay after a failed fetch
//!   SWAP_HTTP_TIMEOUT_SECS - Per-request deadline (default: 10)
//!   SWAP_WATCH_STATE / SWAP_WATCH_INTERVAL_MS - Hot reload of the state file

use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use swap_notifier::config::AppConfig;
use swap_notifier::pipeline::{
    scheduler::{reconcile_scheduler_task, state_watch_task},
    BarkNotifier, FetchBackoff, GraphSwapSource, Reconciler, StateStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Swap notifier starting");

    let config = AppConfig::from_env()?;
    info!("   ├─ Subgraph: {}", config.graph_url);
    info!("   ├─ State file: {}", config.state_path);
    info!("   ├─ Poll interval: {}ms", config.poll_interval_ms);
    info!(
        "   ├─ Fetch backoff: {}ms (max {}ms)",
        config.fetch_backoff_ms, config.fetch_backoff_max_ms
    );
    info!("   ├─ HTTP timeout: {}s", config.http_timeout_secs);
    info!("   └─ Watch state file: {}", config.watch_state);

    let store = Arc::new(StateStore::open(&config.state_path));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let source = Arc::new(GraphSwapSource::new(client.clone(), config.graph_url.clone()));
    let notifier = Arc::new(BarkNotifier::new(client, store.clone()));
    let backoff = FetchBackoff::new(
        Duration::from_millis(config.fetch_backoff_ms),
        Duration::from_millis(config.fetch_backoff_max_ms),
    );
    let reconciler = Reconciler::new(store.clone(), source, notifier, backoff);

    let poll_interval = config.poll_interval_ms;
    let scheduler = tokio::spawn(async move {
        reconcile_scheduler_task(reconciler, poll_interval).await;
    });
    info!("✅ Reconcile scheduler spawned");

    let watcher = if config.watch_state {
        let store_watch = store.clone();
        let watch_interval = config.watch_interval_ms;
        info!("✅ State watcher spawned");
        Some(tokio::spawn(async move {
            state_watch_task(store_watch, watch_interval).await;
        }))
    } else {
        None
    };

    info!("🔄 Press CTRL+C to shutdown");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    scheduler.abort();
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    info!(
        "✅ Swap notifier stopped at block {}",
        store.last_block_number()
    );
    Ok(())
}
