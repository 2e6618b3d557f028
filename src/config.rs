//! Live Simulation Configuration
//!
//! A single `SimulationConfig` value is shared by every component of one
//! simulation through [`SharedConfig`]. Components read it at the moment they
//! need a parameter; external controllers (scenario loaders, dashboards) are
//! the only writers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Handle to the configuration shared by one simulation graph.
pub type SharedConfig = Arc<RwLock<SimulationConfig>>;

/// Synchronization model applied to `sync_send`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncModel {
    /// Every sync send degrades to fire-and-forget
    #[default]
    Asynchronous,
    /// Sync sends are dispatched with ack/timeout tracking
    Synchronous,
    /// Like synchronous, with violations injected by `sync_violation_prob`
    PartialSynchronous,
}

impl SyncModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncModel::Asynchronous => "asynchronous",
            SyncModel::Synchronous => "synchronous",
            SyncModel::PartialSynchronous => "partial_synchronous",
        }
    }
}

/// Simulation parameters, all mutable at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the simulation RNG
    pub seed: u64,

    /// Chance per tick that an idle node's CPU spikes instead of decaying
    pub idle_spike_prob: f64,
    /// Chance per tick that a disk above 70% rotates its logs
    pub log_rotation_prob: f64,
    /// Chance per tick of a random hardware fault
    pub hw_fault_prob: f64,
    /// Chance per tick that each hardware fault self-clears
    pub fault_clear_prob: f64,
    /// Chance per tick that a "Power Supply Warning" kills the node
    pub power_failure_prob: f64,
    /// Gauge percentage above which a node becomes critical
    pub critical_threshold: f64,
    /// Maximum disk growth per tick, in percentage points
    pub disk_growth_rate: f64,
    /// Reset the whole simulation when an invalid algorithm is selected
    pub reset_on_error: bool,

    pub sync_model: SyncModel,
    /// Maximum per-node clock drift (fraction of global time)
    pub max_clock_drift: f64,
    /// Default sync_send timeout in seconds
    pub sync_timeout: f64,
    /// Chance a sync send degrades to async
    pub sync_violation_prob: f64,

    /// Chance a send is dropped (0.0 - 1.0)
    pub packet_loss_rate: f64,
    /// Link bandwidth; reported only, does not alter delay
    pub bandwidth_mbps: f64,
    /// Symmetric jitter bound in seconds
    pub jitter_range: f64,
    /// Chance a send is delayed by an extra 0.1-0.5s
    pub reorder_probability: f64,
    /// Informational flag mirrored from scenario files
    pub partition_enabled: bool,

    /// Entries kept in the in-memory event log
    pub log_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: 42,
            idle_spike_prob: 0.1,
            log_rotation_prob: 0.05,
            hw_fault_prob: 0.005,
            fault_clear_prob: 0.05,
            power_failure_prob: 0.5,
            critical_threshold: 90.0,
            disk_growth_rate: 0.05,
            reset_on_error: true,
            sync_model: SyncModel::Asynchronous,
            max_clock_drift: 0.01,
            sync_timeout: 5.0,
            sync_violation_prob: 0.0,
            packet_loss_rate: 0.0,
            bandwidth_mbps: 1000.0,
            jitter_range: 0.0,
            reorder_probability: 0.0,
            partition_enabled: false,
            log_capacity: 100,
        }
    }
}

impl SimulationConfig {
    /// Calm mode - no random hardware faults, clean network
    pub fn calm() -> Self {
        SimulationConfig {
            hw_fault_prob: 0.0,
            power_failure_prob: 0.0,
            ..Default::default()
        }
    }

    /// Chaos mode - aggressive network and hardware fault injection
    pub fn chaos() -> Self {
        SimulationConfig {
            hw_fault_prob: 0.05,
            power_failure_prob: 0.5,
            packet_loss_rate: 0.1,
            jitter_range: 0.2,
            reorder_probability: 0.1,
            sync_model: SyncModel::PartialSynchronous,
            sync_violation_prob: 0.1,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Wrap into the shared handle injected into a simulation
    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Error loading a configuration file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
            ConfigError::Parse(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
