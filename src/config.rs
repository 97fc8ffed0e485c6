//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Node configuration parameters.
///
/// Built once at startup and passed by reference to everything that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store capacity as a percentage of total physical memory
    pub memory_limit_percent: f64,
    /// Interval in seconds between capacity trim passes
    pub trim_interval: u64,
    /// Interval in seconds between metrics samples
    pub metrics_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_LIMIT_PERCENT` - Store capacity, percent of physical memory (default: 50)
    /// - `TRIM_INTERVAL` - Trim frequency in seconds (default: 5)
    /// - `METRICS_INTERVAL` - Metrics sampling frequency in seconds (default: 1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_limit_percent: env_or("MEMORY_LIMIT_PERCENT", defaults.memory_limit_percent),
            trim_interval: env_or("TRIM_INTERVAL", defaults.trim_interval),
            metrics_interval: env_or("METRICS_INTERVAL", defaults.metrics_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.memory_limit_percent.is_finite()
            || self.memory_limit_percent <= 0.0
            || self.memory_limit_percent > 100.0
        {
            return Err(CacheError::InvalidConfiguration(format!(
                "memory limit percent must be in (0, 100], got {}",
                self.memory_limit_percent
            )));
        }
        if self.trim_interval == 0 {
            return Err(CacheError::InvalidConfiguration(
                "trim interval must be at least 1 second".to_string(),
            ));
        }
        if self.metrics_interval == 0 {
            return Err(CacheError::InvalidConfiguration(
                "metrics interval must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn trim_period(&self) -> Duration {
        Duration::from_secs(self.trim_interval)
    }

    pub fn metrics_period(&self) -> Duration {
        Duration::from_secs(self.metrics_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_limit_percent: 50.0,
            trim_interval: 5,
            metrics_interval: 1,
            server_port: 3000,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
