use super::BenchmarkError;
use crate::metrics::{MetricsSnapshot, NodeStats};
use crate::simulator::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of one benchmark trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub scenario_name: String,
    /// Wall-clock completion time, RFC 3339
    pub timestamp: String,
    /// Simulated seconds at collection
    pub simulation_time: f64,
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub node_metrics: BTreeMap<NodeId, NodeStats>,
}

impl BenchmarkResults {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BenchmarkError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BenchmarkError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub values: Vec<f64>,
}

impl MetricSummary {
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Some(MetricSummary { min, max, avg, values })
    }
}

/// Key metrics compared across a set of results
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub scenarios: Vec<String>,
    pub metrics: BTreeMap<String, MetricSummary>,
}

/// Every result collected by a runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: String,
    pub total_scenarios: usize,
    pub results: Vec<BenchmarkResults>,
}
