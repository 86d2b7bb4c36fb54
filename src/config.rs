//! Runtime configuration from environment variables

use std::env;
use thiserror::Error;

pub const DEFAULT_GRAPH_URL: &str =
    "https://api.studio.thegraph.com/query/100116/contract_3e2f0/version/latest";
pub const DEFAULT_STATE_PATH: &str = "app_config.json";

/// Configuration for the notifier runtime
///
/// Loaded from environment variables (and `.env`) with defaults matching the
/// reference deployment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// GraphQL endpoint serving `swaps`
    pub graph_url: String,

    /// Path to the JSON state file
    pub state_path: String,

    /// Reconciliation tick in milliseconds
    pub poll_interval_ms: u64,

    /// Delay after the first failed fetch
    pub fetch_backoff_ms: u64,

    /// Upper bound for the delay after repeated failed fetches
    pub fetch_backoff_max_ms: u64,

    /// Deadline for every outbound HTTP request
    pub http_timeout_secs: u64,

    /// Reload the state file when it is edited externally
    pub watch_state: bool,

    /// How often the watcher checks the state file
    pub watch_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SWAP_GRAPH_URL` (default: the studio subgraph endpoint)
    /// - `SWAP_STATE_PATH` (default: app_config.json)
    /// - `SWAP_POLL_INTERVAL_MS` (default: 1000)
    /// - `SWAP_FETCH_BACKOFF_MS` (default: 3000)
    /// - `SWAP_FETCH_BACKOFF_MAX_MS` (default: same as `SWAP_FETCH_BACKOFF_MS`)
    /// - `SWAP_HTTP_TIMEOUT_SECS` (default: 10)
    /// - `SWAP_WATCH_STATE` (default: true)
    /// - `SWAP_WATCH_INTERVAL_MS` (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let graph_url =
            env::var("SWAP_GRAPH_URL").unwrap_or_else(|_| DEFAULT_GRAPH_URL.to_string());

        if !graph_url.starts_with("http://") && !graph_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SWAP_GRAPH_URL must start with http:// or https://".to_string(),
            ));
        }

        let poll_interval_ms = parse_var("SWAP_POLL_INTERVAL_MS", 1_000);
        if poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SWAP_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let fetch_backoff_ms = parse_var("SWAP_FETCH_BACKOFF_MS", 3_000);

        Ok(Self {
            graph_url,
            state_path: env::var("SWAP_STATE_PATH")
                .unwrap_or_else(|_| DEFAULT_STATE_PATH.to_string()),
            poll_interval_ms,
            fetch_backoff_ms,
            fetch_backoff_max_ms: parse_var("SWAP_FETCH_BACKOFF_MAX_MS", fetch_backoff_ms)
                .max(fetch_backoff_ms),
            http_timeout_secs: parse_var("SWAP_HTTP_TIMEOUT_SECS", 10),
            watch_state: env::var("SWAP_WATCH_STATE")
                .ok()
                .and_then(|s| s.to_lowercase().parse().ok())
                .unwrap_or(true),
            watch_interval_ms: parse_var("SWAP_WATCH_INTERVAL_MS", 1_000).max(1),
        })
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
