//! Cache Metrics Module
//!
//! The sink the engine and sampler publish to, and an in-process
//! implementation backed by atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Metrics Sink ==
/// Receiver of cache telemetry.
///
/// Values are advisory; nothing in the engine reads them back to make
/// decisions.
pub trait MetricsSink: Send + Sync {
    fn increment_adds(&self);
    fn increment_gets(&self);
    fn increment_removes(&self);
    fn set_object_count(&self, count: u64);
    fn set_memory_usage_mb(&self, mb: u64);
    fn set_memory_usage_limit_mb(&self, mb: u64);
    fn set_memory_usage_percent(&self, percent: f64);
}

// == Cache Metrics ==
/// Lock-free `MetricsSink` that can be read at any time.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    adds: AtomicU64,
    gets: AtomicU64,
    removes: AtomicU64,
    object_count: AtomicU64,
    memory_usage_mb: AtomicU64,
    memory_usage_limit_mb: AtomicU64,
    /// f64 bit pattern
    memory_usage_percent: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub adds: u64,
    pub gets: u64,
    pub removes: u64,
    pub object_count: u64,
    pub memory_usage_mb: u64,
    pub memory_usage_limit_mb: u64,
    pub memory_usage_percent: f64,
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates a new CacheMetrics with all values at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            adds: self.adds.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            object_count: self.object_count.load(Ordering::Relaxed),
            memory_usage_mb: self.memory_usage_mb.load(Ordering::Relaxed),
            memory_usage_limit_mb: self.memory_usage_limit_mb.load(Ordering::Relaxed),
            memory_usage_percent: f64::from_bits(self.memory_usage_percent.load(Ordering::Relaxed)),
        }
    }
}

impl MetricsSink for CacheMetrics {
    fn increment_adds(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_gets(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_removes(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    fn set_object_count(&self, count: u64) {
        self.object_count.store(count, Ordering::Relaxed);
    }

    fn set_memory_usage_mb(&self, mb: u64) {
        self.memory_usage_mb.store(mb, Ordering::Relaxed);
    }

    fn set_memory_usage_limit_mb(&self, mb: u64) {
        self.memory_usage_limit_mb.store(mb, Ordering::Relaxed);
    }

    fn set_memory_usage_percent(&self, percent: f64) {
        self.memory_usage_percent
            .store(percent.to_bits(), Ordering::Relaxed);
    }
}
