use super::{DeterministicRng, NodeId, VirtualTime};
use std::collections::HashMap;

/// Per-node clock drift. Each node gets a fixed random drift the first time
/// its local clock is read; the drift stays fixed until `reset`.
#[derive(Debug, Default)]
pub struct ClockDrift {
    drifts: HashMap<NodeId, f64>,
}

impl ClockDrift {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drift for `node`, drawn uniformly from `[-max_drift, +max_drift]` on first use.
    pub fn drift(&mut self, node: &NodeId, max_drift: f64, rng: &mut DeterministicRng) -> f64 {
        if let Some(drift) = self.drifts.get(node) {
            return *drift;
        }
        let bound = max_drift.abs();
        let drift = rng.gen_range_f64(-bound, bound);
        self.drifts.insert(node.clone(), drift);
        drift
    }

    /// Node-local time in seconds: `global × (1 + drift)`.
    pub fn local_time(
        &mut self,
        node: &NodeId,
        global: VirtualTime,
        max_drift: f64,
        rng: &mut DeterministicRng,
    ) -> f64 {
        let global = global.as_secs_f64();
        global + global * self.drift(node, max_drift, rng)
    }

    pub fn forget(&mut self, node: &NodeId) {
        self.drifts.remove(node);
    }

    pub fn reset(&mut self) {
        self.drifts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_fixed_per_node() {
        let mut clock = ClockDrift::new();
        let mut rng = DeterministicRng::new(5);
        let node = NodeId::from("R1-S1");

        let first = clock.drift(&node, 0.01, &mut rng);
        assert!(first.abs() <= 0.01);
        assert_eq!(clock.drift(&node, 0.5, &mut rng), first);
    }

    #[test]
    fn test_local_time_applies_drift() {
        let mut clock = ClockDrift::new();
        let mut rng = DeterministicRng::new(5);
        let node = NodeId::from("R1-S1");
        let drift = clock.drift(&node, 0.01, &mut rng);

        let local = clock.local_time(&node, VirtualTime::from_secs(100), 0.01, &mut rng);
        assert!((local - 100.0 * (1.0 + drift)).abs() < 1e-9);
        assert_eq!(clock.local_time(&node, VirtualTime::ZERO, 0.01, &mut rng), 0.0);
    }

    #[test]
    fn test_zero_max_drift_is_identity() {
        let mut clock = ClockDrift::new();
        let mut rng = DeterministicRng::new(5);
        let local = clock.local_time(&NodeId::from("n"), VirtualTime::from_secs(7), 0.0, &mut rng);
        assert_eq!(local, 7.0);
    }
}
