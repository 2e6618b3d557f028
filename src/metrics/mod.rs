//! Simulation Metrics
//!
//! Latency is measured by matching sends to receives on message id,
//! throughput over a trailing window, and everything else with plain counters:
//!
//! - **Global** statistics across all traffic
//! - **Per-node** statistics for the traffic each node originates
//! - **Export** to JSON and flat `Metric,Value` CSV

mod types;
mod latency;
mod throughput;
mod collector;

pub use types::{LatencyStats, ThroughputStats, MetricsSnapshot, NodeStats};
pub use latency::LatencyTracker;
pub use throughput::ThroughputTracker;
pub use collector::MetricsCollector;
