//! Background tasks: the reconciliation tick and the state file watcher

use super::reconcile::{PassOutcome, Reconciler};
use super::state_store::StateStore;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Run one reconciliation pass per tick, forever
///
/// Each pass is awaited before the next tick is taken, so passes never
/// overlap; ticks missed while a slow pass runs are skipped rather than
/// bunched up. Errors are logged and retried on the next tick.
pub async fn reconcile_scheduler_task(mut reconciler: Reconciler, interval_ms: u64) {
    log::info!("⏰ Starting reconcile scheduler (interval: {}ms)", interval_ms);

    let mut timer = interval(Duration::from_millis(interval_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        match reconciler.run_pass().await {
            Ok(PassOutcome::NoNewSwaps) => {}
            Ok(PassOutcome::Checkpointed(report)) => {
                log::debug!("Pass finished at block {}", report.block_number);
            }
            Err(e) => {
                log::error!("exec job failed: name=graph_task err={}", e);
            }
        }
    }
}

/// Reload the state file when something other than the store edits it
///
/// Polls the file's modification time every `interval_ms`. Reloads go
/// through the store's I/O guard, so they never interleave with a checkpoint.
pub async fn state_watch_task(store: Arc<StateStore>, interval_ms: u64) {
    log::info!(
        "👀 Watching {} for changes (interval: {}ms)",
        store.path().display(),
        interval_ms
    );

    let mut timer = interval(Duration::from_millis(interval_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        if !store.changed_on_disk() {
            continue;
        }

        log::info!("State file modified, reloading...");
        match store.reload() {
            Ok(()) => log::info!(
                "✅ Reloaded state (block {}, {} targets)",
                store.last_block_number(),
                store.notification_targets().len()
            ),
            Err(e) => log::error!("❌ Failed to reload state file: {}", e),
        }
    }
}
