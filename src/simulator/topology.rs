//! Standard leaf-spine datacenter layout.

use super::{Duration, Network, NodeSpec, Simulator, Switch};
use crate::algorithm::AlgorithmRegistry;
use crate::config::SharedConfig;
use serde::{Deserialize, Serialize};

pub const SPINE_ID: &str = "Spine-Switch";

/// Racks of servers behind one leaf each, all leaves joined by one spine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datacenter {
    pub nodes_per_rack: Vec<u32>,
    /// Base one-hop latency in seconds
    pub latency: f64,
}

impl Default for Datacenter {
    fn default() -> Self {
        Datacenter {
            nodes_per_rack: vec![5, 4],
            latency: 1.0,
        }
    }
}

impl Datacenter {
    pub fn new(nodes_per_rack: Vec<u32>) -> Self {
        Datacenter {
            nodes_per_rack,
            ..Default::default()
        }
    }

    pub fn rack_id(rack: usize) -> String {
        format!("Rack{}", rack)
    }

    pub fn leaf_id(rack: usize) -> String {
        format!("Leaf-Rack{}", rack)
    }

    /// Node specs, rack by rack. Odd racks hold 8-core/32 GB servers, even
    /// racks 16-core/128 GB.
    pub fn node_specs(&self) -> Vec<NodeSpec> {
        let mut specs = Vec::new();
        for (idx, count) in self.nodes_per_rack.iter().enumerate() {
            let rack = idx + 1;
            let (cores, ram_gb) = if rack % 2 == 1 { (8, 32) } else { (16, 128) };
            for i in 1..=*count {
                specs.push(
                    NodeSpec::new(format!("R{}-S{}", rack, i), Self::rack_id(rack))
                        .with_ip(format!("192.168.{}.{}", rack, 10 + i - 1))
                        .with_resources(cores, ram_gb),
                );
            }
        }
        specs
    }

    pub fn switches(&self) -> Vec<Switch> {
        let mut switches: Vec<Switch> = (1..=self.nodes_per_rack.len())
            .map(|rack| Switch::leaf(Self::leaf_id(rack), Self::rack_id(rack)))
            .collect();
        switches.push(Switch::spine(SPINE_ID));
        switches
    }

    /// A ready simulator: network, switches and nodes in place, initial
    /// state saved, built-in algorithms loaded.
    pub fn build(&self, config: SharedConfig) -> Simulator {
        let mut sim = Simulator::new(config);
        sim.register_network(Network::new(Duration::from_secs_f64(self.latency)));
        for switch in self.switches() {
            sim.register_switch(switch);
        }
        for spec in self.node_specs() {
            sim.add_node(spec);
        }
        sim.save_initial_state();
        sim.load_algorithms(&AlgorithmRegistry::builtin());
        sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn test_default_layout() {
        let specs = Datacenter::default().node_specs();
        assert_eq!(specs.len(), 9);
        assert_eq!(specs[0].node_id.as_str(), "R1-S1");
        assert_eq!(specs[0].ip_address.as_deref(), Some("192.168.1.10"));
        assert_eq!(specs[5].node_id.as_str(), "R2-S1");
        assert_eq!((specs[5].cores, specs[5].ram_gb), (16, 128));
        assert_eq!(specs[8].ip_address.as_deref(), Some("192.168.2.13"));
    }

    #[test]
    fn test_build_attaches_everything() {
        let sim = Datacenter::default().build(SimulationConfig::calm().shared());
        assert_eq!(sim.node_count(), 9);
        assert_eq!(sim.initial_state().len(), 9);
        assert_eq!(sim.network().switch("Leaf-Rack1").unwrap().active_connections, 5);
        assert_eq!(sim.network().switch("Leaf-Rack2").unwrap().active_connections, 4);
        assert_eq!(sim.network().switch(SPINE_ID).unwrap().active_connections, 2);
        assert_eq!(sim.network().latency(), Duration::from_secs(1));
        assert!(sim.controller().algorithm_names().any(|n| n == "random_traffic"));
    }
}
