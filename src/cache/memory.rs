//! Memory Module
//!
//! Converts a percentage of physical memory into an absolute store ceiling
//! and samples the current process footprint.

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use crate::error::{CacheError, Result};

pub const BYTES_PER_MB: u64 = 1024 * 1024;

// == Memory Capacity ==
/// Absolute byte ceiling of a bounded store, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryCapacity {
    percent: f64,
    limit_bytes: u64,
}

impl MemoryCapacity {
    /// Converts `percent` of `total_memory_bytes` into a byte ceiling.
    ///
    /// Fails with `InvalidConfiguration` for a percentage outside (0, 100].
    pub fn from_percent(percent: f64, total_memory_bytes: u64) -> Result<Self> {
        if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
            return Err(CacheError::InvalidConfiguration(format!(
                "capacity percentage must be in (0, 100], got {}",
                percent
            )));
        }

        let limit_bytes = (total_memory_bytes as f64 * percent / 100.0) as u64;
        Ok(Self {
            percent,
            limit_bytes,
        })
    }

    /// Uses the total physical memory reported by the OS.
    pub fn of_system_memory(percent: f64) -> Result<Self> {
        Self::from_percent(percent, system_total_memory_bytes())
    }

    /// A fixed ceiling, mostly useful for tests.
    pub fn from_bytes(limit_bytes: u64) -> Self {
        Self {
            percent: 100.0,
            limit_bytes,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub fn limit_mb(&self) -> u64 {
        self.limit_bytes / BYTES_PER_MB
    }
}

/// Total physical memory of the host in bytes.
pub fn system_total_memory_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

// == Memory Probe ==
/// Source of the current process memory footprint.
pub trait MemoryProbe: Send + Sync {
    /// Resident memory of this process in bytes, if it can be read.
    fn process_memory_bytes(&self) -> Option<u64>;
}

/// `MemoryProbe` backed by sysinfo.
pub struct SysinfoProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn process_memory_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut sys = self.system.lock();
        sys.refresh_process(pid);
        sys.process(pid).map(|p| p.memory())
    }
}

/// `MemoryProbe` returning a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn process_memory_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}
