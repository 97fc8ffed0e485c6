//! Capacity Trim Task
//!
//! Background task that periodically trims the active store: expired entries
//! first, then least recently used normal-priority entries while the store
//! is over its memory ceiling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheEngine, TrimReport};

/// Spawns a background task that trims the engine's store every `interval`.
///
/// Each pass targets whichever store is active at that moment, so a `clear`
/// between passes is picked up automatically. Passes never overlap; a pass
/// that overruns the interval causes missed ticks to be skipped.
///
/// # Arguments
/// * `engine` - Shared engine whose active store is trimmed
/// * `interval` - Time between trim passes
/// * `cancel` - Token that stops the loop when cancelled
///
/// # Example
/// ```ignore
/// let cancel = CancellationToken::new();
/// let handle = spawn_trim_task(engine.clone(), Duration::from_secs(5), cancel.clone());
/// // Later, during shutdown:
/// cancel.cancel();
/// handle.await?;
/// ```
pub fn spawn_trim_task(
    engine: Arc<CacheEngine>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting trim task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(report) = run_trim_pass(engine.clone()).await else {
                continue;
            };

            if report.removed() > 0 {
                info!(
                    "Trim: removed {} expired and {} evicted entries, {} bytes in use",
                    report.expired, report.evicted, report.size_bytes
                );
            } else {
                debug!("Trim: nothing to remove, {} bytes in use", report.size_bytes);
            }
        }

        info!("Trim task stopped");
    })
}

/// Runs one trim pass on the blocking pool, off the async workers.
///
/// Returns None if the pass panicked.
pub async fn run_trim_pass(engine: Arc<CacheEngine>) -> Option<TrimReport> {
    match tokio::task::spawn_blocking(move || engine.trim()).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Trim pass failed: {}", e);
            None
        }
    }
}
