//! Reconciliation pass: fetch → filter → notify → checkpoint
//!
//! One call to [`Reconciler::run_pass`] per scheduler tick:
//! 1. Fetch every swap above the persisted `lastBlockNumber`
//! 2. Drop swaps whose tx hash is in the persisted dedup window
//! 3. Format and push the rest, newest first
//! 4. Move `lastBlockNumber` to the newest fetched block and replace the
//!    dedup window with the hashes handled in this pass
//!
//! A failed fetch changes nothing, so the next tick retries from the same
//! checkpoint. An empty fetch does not touch the state file.

use super::backoff::FetchBackoff;
use super::formatter::{format_swap, local_time};
use super::graph::{FetchError, SwapSource};
use super::notifier::NotificationSink;
use super::state_store::{parse_block_number, StateStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("fetching swaps failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("persisted checkpoint is unusable: {0}")]
    InvalidCheckpoint(#[source] StoreError),

    #[error("writing checkpoint failed: {0}")]
    Checkpoint(#[source] StoreError),
}

/// Counters for a pass that reached the checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub fetched: usize,
    /// Already in the dedup window, or repeated within this pass
    pub already_seen: usize,
    pub notified: usize,
    /// Could not be formatted; counted as handled
    pub skipped: usize,
    /// No target accepted the message
    pub failed: usize,
    pub block_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    NoNewSwaps,
    Checkpointed(PassReport),
}

pub struct Reconciler {
    store: Arc<StateStore>,
    source: Arc<dyn SwapSource>,
    sink: Arc<dyn NotificationSink>,
    backoff: FetchBackoff,
}

impl Reconciler {
    pub fn new(
        store: Arc<StateStore>,
        source: Arc<dyn SwapSource>,
        sink: Arc<dyn NotificationSink>,
        backoff: FetchBackoff,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            backoff,
        }
    }

    pub async fn run_pass(&mut self) -> Result<PassOutcome, PassError> {
        let since_block = parse_block_number(&self.store.last_block_number())
            .map_err(PassError::InvalidCheckpoint)?;

        let swaps = match self.source.fetch_new_swaps(since_block).await {
            Ok(swaps) => {
                self.backoff.reset();
                swaps
            }
            Err(e) => {
                log::error!("❌ Error fetching swaps since block {}: {}", since_block, e);
                self.backoff.sleep().await;
                return Err(e.into());
            }
        };

        let Some(newest) = swaps.first() else {
            log::debug!("No new swaps found above block {}", since_block);
            return Ok(PassOutcome::NoNewSwaps);
        };

        let known: HashSet<String> = self.store.recent_tx_hashes().into_iter().collect();
        let mut handled_this_pass: HashSet<&str> = HashSet::new();
        let mut processed: Vec<String> = Vec::new();
        let mut report = PassReport {
            fetched: swaps.len(),
            block_number: newest.block_number.clone(),
            ..PassReport::default()
        };

        for swap in &swaps {
            let tx = swap.transaction_hash.as_str();
            if known.contains(tx) || !handled_this_pass.insert(tx) {
                report.already_seen += 1;
                continue;
            }

            log::info!(
                "🔔 New swap detected: block={} tx={} time={} btcPrice={}",
                swap.block_number,
                tx,
                local_time(&swap.block_timestamp).unwrap_or_else(|| swap.block_timestamp.clone()),
                swap.btc_price.as_deref().unwrap_or("-")
            );

            let message = format_swap(swap);
            if message.is_empty() {
                log::warn!("⚠️  Swap {} could not be formatted, skipping", tx);
                report.skipped += 1;
                processed.push(tx.to_string());
                continue;
            }

            match self.sink.notify(&message).await {
                Ok(delivered) => {
                    log::debug!("Swap {} delivered to {} target(s)", tx, delivered);
                    report.notified += 1;
                    processed.push(tx.to_string());
                }
                Err(e) => {
                    log::error!("❌ Error sending notification for {}: {}", tx, e);
                    report.failed += 1;
                }
            }
        }

        self.store
            .checkpoint(&report.block_number, processed)
            .map_err(PassError::Checkpoint)?;

        log::info!(
            "✅ Checkpoint at block {} ({} fetched, {} notified, {} seen, {} skipped, {} failed)",
            report.block_number,
            report.fetched,
            report.notified,
            report.already_seen,
            report.skipped,
            report.failed
        );

        Ok(PassOutcome::Checkpointed(report))
    }
}
