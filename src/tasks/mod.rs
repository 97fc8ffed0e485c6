//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the node is up.
//!
//! # Tasks
//! - Trim: Brings the active store back under its memory ceiling
//! - Metrics sampling: Publishes object count and memory usage

mod sampler;
mod trim;

pub use sampler::{spawn_sampler_task, MetricsSampler, Sample};
pub use trim::{run_trim_pass, spawn_trim_task};
