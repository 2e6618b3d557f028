//! Fault Injection Points
//!
//! Every probabilistic fault the simulator can inject goes through
//! [`FaultStats::roll`], which draws from the simulation's deterministic RNG
//! and records how often each fault point was checked and how often it fired.
//! Stats belong to one simulation instance; benchmark trials merge theirs.

use crate::simulator::DeterministicRng;
use std::collections::BTreeMap;

/// Network faults - per-send chaos
pub mod network {
    /// Drop the message before it is scheduled
    pub const PACKET_LOSS: &str = "network.packet_loss";
    /// Perturb delivery latency symmetrically
    pub const JITTER: &str = "network.jitter";
    /// Delay a message by an extra 0.1-0.5s so it overtakes/falls behind others
    pub const REORDER: &str = "network.reorder";
}

/// Node faults - per-tick hardware chaos
pub mod node {
    /// Idle CPU spikes instead of decaying
    pub const IDLE_SPIKE: &str = "node.idle_spike";
    /// Disk usage drops after log rotation
    pub const LOG_ROTATION: &str = "node.log_rotation";
    /// Random hardware fault is raised
    pub const HW_FAULT: &str = "node.hw_fault";
    /// A hardware fault clears itself
    pub const FAULT_CLEAR: &str = "node.fault_clear";
    /// A failing power supply shuts the node down
    pub const POWER_FAILURE: &str = "node.power_failure";
}

/// Synchronization faults
pub mod sync {
    /// A sync send degrades to async
    pub const VIOLATION: &str = "sync.violation";
}

/// Check/trigger counts per fault point
#[derive(Debug, Clone, Default)]
pub struct FaultStats {
    /// Number of times each fault was checked
    pub checks: BTreeMap<String, u64>,
    /// Number of times each fault was triggered
    pub triggers: BTreeMap<String, u64>,
}

impl FaultStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll a fault with the given probability, recording the outcome.
    pub fn roll(&mut self, fault_id: &str, probability: f64, rng: &mut DeterministicRng) -> bool {
        self.record_check(fault_id);
        let triggered = rng.gen_bool(probability.clamp(0.0, 1.0));
        if triggered {
            self.record_trigger(fault_id);
        }
        triggered
    }

    pub fn record_check(&mut self, fault_id: &str) {
        *self.checks.entry(fault_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_trigger(&mut self, fault_id: &str) {
        *self.triggers.entry(fault_id.to_string()).or_insert(0) += 1;
    }

    pub fn triggers(&self, fault_id: &str) -> u64 {
        self.triggers.get(fault_id).copied().unwrap_or(0)
    }

    pub fn trigger_rate(&self, fault_id: &str) -> f64 {
        let checks = self.checks.get(fault_id).copied().unwrap_or(0);
        let triggers = self.triggers(fault_id);
        if checks == 0 {
            0.0
        } else {
            triggers as f64 / checks as f64
        }
    }

    pub fn merge(&mut self, other: &FaultStats) {
        for (k, v) in &other.checks {
            *self.checks.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.triggers {
            *self.triggers.entry(k.clone()).or_insert(0) += v;
        }
    }

    pub fn summary(&self) -> String {
        let mut lines = vec!["Fault injection:".to_string()];
        for fault_id in self.checks.keys() {
            let checks = self.checks.get(fault_id).copied().unwrap_or(0);
            lines.push(format!(
                "  {}: {}/{} ({:.2}%)",
                fault_id,
                self.triggers(fault_id),
                checks,
                self.trigger_rate(fault_id) * 100.0
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certain_and_impossible_faults() {
        let mut stats = FaultStats::new();
        let mut rng = DeterministicRng::new(42);

        for _ in 0..100 {
            assert!(stats.roll("test.always", 1.0, &mut rng));
            assert!(!stats.roll("test.never", 0.0, &mut rng));
        }
        assert_eq!(stats.triggers("test.always"), 100);
        assert_eq!(stats.triggers("test.never"), 0);
        assert_eq!(stats.trigger_rate("test.always"), 1.0);
        assert_eq!(stats.trigger_rate("unknown"), 0.0);
    }

    #[test]
    fn test_rate_tracks_probability() {
        let mut stats = FaultStats::new();
        let mut rng = DeterministicRng::new(3);
        for _ in 0..10_000 {
            stats.roll(network::PACKET_LOSS, 0.1, &mut rng);
        }
        let rate = stats.trigger_rate(network::PACKET_LOSS);
        assert!(rate > 0.07 && rate < 0.13, "rate: {}", rate);
    }

    #[test]
    fn test_merge_and_summary() {
        let mut a = FaultStats::new();
        let mut b = FaultStats::new();
        a.record_check(node::HW_FAULT);
        b.record_check(node::HW_FAULT);
        b.record_trigger(node::HW_FAULT);
        a.merge(&b);
        assert_eq!(a.checks[node::HW_FAULT], 2);
        assert!(a.summary().contains("node.hw_fault: 1/2 (50.00%)"));
    }
}
