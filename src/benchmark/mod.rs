//! Benchmark Scenarios
//!
//! A scenario declares network, synchronization and fault parameters plus a
//! partition schedule. The runner applies it to a fresh simulator, advances
//! the simulation one second at a time and persists the collected metrics.

mod scenario;
mod results;
mod runner;

pub use scenario::{load_scenarios, BenchmarkScenario, PartitionEvent};
pub use results::{BenchmarkResults, Comparison, MetricSummary, Report};
pub use runner::BenchmarkRunner;

use std::fmt;

/// Error reading or writing benchmark files
#[derive(Debug)]
pub enum BenchmarkError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for BenchmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkError::Io(e) => write!(f, "benchmark I/O error: {}", e),
            BenchmarkError::Json(e) => write!(f, "invalid benchmark JSON: {}", e),
        }
    }
}

impl std::error::Error for BenchmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchmarkError::Io(e) => Some(e),
            BenchmarkError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for BenchmarkError {
    fn from(e: std::io::Error) -> Self {
        BenchmarkError::Io(e)
    }
}

impl From<serde_json::Error> for BenchmarkError {
    fn from(e: serde_json::Error) -> Self {
        BenchmarkError::Json(e)
    }
}
