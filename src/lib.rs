pub mod config;
pub mod faults;
pub mod simulator;
pub mod metrics;
pub mod algorithm;
pub mod benchmark;

pub use config::{SharedConfig, SimulationConfig, SyncModel};
pub use simulator::{Duration, NodeId, Simulator, VirtualTime};
pub use simulator::topology::Datacenter;
pub use algorithm::{Algorithm, AlgorithmController, AlgorithmRegistry};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use benchmark::{BenchmarkRunner, BenchmarkScenario};
