//! Metrics Sampler
//!
//! Publishes object count and memory usage to a metrics sink on a fixed
//! period, independent of request traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheEngine, MemoryProbe, MetricsSink, BYTES_PER_MB};

// == Sample ==
/// Values published by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub object_count: u64,
    pub memory_usage_mb: u64,
    pub memory_limit_mb: u64,
    pub memory_usage_percent: f64,
}

// == Metrics Sampler ==
pub struct MetricsSampler {
    engine: Arc<CacheEngine>,
    probe: Arc<dyn MemoryProbe>,
    sink: Arc<dyn MetricsSink>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a tick ends, even by unwinding.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MetricsSampler {
    pub fn new(
        engine: Arc<CacheEngine>,
        probe: Arc<dyn MemoryProbe>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            engine,
            probe,
            sink,
            in_flight: AtomicBool::new(false),
        }
    }

    // == Tick ==
    /// Takes one sample and publishes it.
    ///
    /// Returns None without sampling if another tick is still running.
    pub fn tick(&self) -> Option<Sample> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("Metrics tick skipped, previous tick still running");
            return None;
        }
        let _guard = TickGuard(&self.in_flight);

        let sample = self.sample();
        self.sink.set_object_count(sample.object_count);
        self.sink.set_memory_usage_mb(sample.memory_usage_mb);
        self.sink.set_memory_usage_limit_mb(sample.memory_limit_mb);
        self.sink.set_memory_usage_percent(sample.memory_usage_percent);

        Some(sample)
    }

    fn sample(&self) -> Sample {
        let object_count = self.engine.count() as u64;
        // Fall back to the store's own accounting if the OS can't be read
        let used_bytes = self
            .probe
            .process_memory_bytes()
            .unwrap_or_else(|| self.engine.memory_usage_bytes() as u64);
        let limit_bytes = self.engine.capacity().limit_bytes();

        let memory_usage_percent = if limit_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / limit_bytes as f64 * 100.0
        };

        Sample {
            object_count,
            memory_usage_mb: used_bytes / BYTES_PER_MB,
            memory_limit_mb: self.engine.memory_limit_mb(),
            memory_usage_percent,
        }
    }
}

/// Spawns a background task that calls [`MetricsSampler::tick`] every `period`.
///
/// Ticks run one at a time on a single loop; if one overruns the period,
/// missed ticks are skipped rather than queued.
pub fn spawn_sampler_task(
    sampler: Arc<MetricsSampler>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting metrics sampler with period of {:?}", period);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Some(sample) = sampler.tick() {
                debug!(
                    "Metrics: {} objects, {} MB of {} MB ({:.1}%)",
                    sample.object_count,
                    sample.memory_usage_mb,
                    sample.memory_limit_mb,
                    sample.memory_usage_percent
                );
            }
        }

        info!("Metrics sampler stopped");
    })
}
