use super::BenchmarkError;
use crate::config::{SimulationConfig, SyncModel};
use crate::simulator::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Partition active from `time` for `duration` seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionEvent {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub group1: Vec<NodeId>,
    #[serde(default)]
    pub group2: Vec<NodeId>,
    #[serde(default = "default_partition_duration")]
    pub duration: f64,
}

impl PartitionEvent {
    pub fn groups(&self) -> (BTreeSet<NodeId>, BTreeSet<NodeId>) {
        (
            self.group1.iter().cloned().collect(),
            self.group2.iter().cloned().collect(),
        )
    }
}

/// Declarative description of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkScenario {
    pub name: String,
    pub description: String,
    /// Simulated seconds; the fractional part is not run
    pub duration: f64,

    #[serde(default = "default_latency")]
    pub latency: f64,
    #[serde(default)]
    pub packet_loss_rate: f64,
    #[serde(default)]
    pub jitter_range: f64,
    #[serde(default)]
    pub reorder_probability: f64,
    #[serde(default = "default_bandwidth")]
    pub bandwidth_mbps: f64,

    #[serde(default)]
    pub sync_model: SyncModel,
    #[serde(default = "default_clock_drift")]
    pub max_clock_drift: f64,
    #[serde(default)]
    pub sync_violation_prob: f64,

    #[serde(default)]
    pub hw_fault_prob: f64,
    #[serde(default)]
    pub power_failure_prob: f64,
    #[serde(default)]
    pub partition_schedule: Vec<PartitionEvent>,

    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    #[serde(default = "default_nodes_per_rack")]
    pub nodes_per_rack: Vec<u32>,

    #[serde(default)]
    pub algorithm_name: Option<String>,
}

fn default_partition_duration() -> f64 {
    10.0
}

fn default_latency() -> f64 {
    0.5
}

fn default_bandwidth() -> f64 {
    1000.0
}

fn default_clock_drift() -> f64 {
    0.01
}

fn default_num_nodes() -> u32 {
    9
}

fn default_nodes_per_rack() -> Vec<u32> {
    vec![5, 4]
}

impl BenchmarkScenario {
    /// A fault-free scenario with every optional field at its default.
    pub fn new(name: impl Into<String>, description: impl Into<String>, duration: f64) -> Self {
        BenchmarkScenario {
            name: name.into(),
            description: description.into(),
            duration,
            latency: default_latency(),
            packet_loss_rate: 0.0,
            jitter_range: 0.0,
            reorder_probability: 0.0,
            bandwidth_mbps: default_bandwidth(),
            sync_model: SyncModel::default(),
            max_clock_drift: default_clock_drift(),
            sync_violation_prob: 0.0,
            hw_fault_prob: 0.0,
            power_failure_prob: 0.0,
            partition_schedule: Vec::new(),
            num_nodes: default_num_nodes(),
            nodes_per_rack: default_nodes_per_rack(),
            algorithm_name: None,
        }
    }

    pub fn with_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm_name = Some(name.into());
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, BenchmarkError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BenchmarkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, BenchmarkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), BenchmarkError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Whole simulated seconds to run
    pub fn steps(&self) -> u64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration.floor() as u64
        } else {
            0
        }
    }

    /// Copy the network, synchronization and fault parameters into `config`.
    pub fn apply_to_config(&self, config: &mut SimulationConfig) {
        config.packet_loss_rate = self.packet_loss_rate;
        config.jitter_range = self.jitter_range;
        config.reorder_probability = self.reorder_probability;
        config.bandwidth_mbps = self.bandwidth_mbps;

        config.sync_model = self.sync_model;
        config.max_clock_drift = self.max_clock_drift;
        config.sync_violation_prob = self.sync_violation_prob;

        config.hw_fault_prob = self.hw_fault_prob;
        config.power_failure_prob = self.power_failure_prob;
        config.partition_enabled = !self.partition_schedule.is_empty();
    }
}

/// Parse every `*.json` file in `dir`, in file-name order. A file that fails
/// to parse is reported next to its path instead of aborting the load.
pub fn load_scenarios(
    dir: impl AsRef<Path>,
) -> Result<Vec<(PathBuf, Result<BenchmarkScenario, BenchmarkError>)>, BenchmarkError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let scenario = BenchmarkScenario::from_json_file(&path);
            (path, scenario)
        })
        .collect())
}
