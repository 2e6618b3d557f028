use super::Algorithm;
use crate::simulator::{LiveNodes, NodeId};

/// Background traffic: occasionally one node pings a random peer, and every
/// ping is answered with a pong to its sender.
#[derive(Debug, Clone)]
pub struct RandomTraffic {
    send_probability: f64,
}

impl RandomTraffic {
    pub const NAME: &'static str = "random_traffic";

    pub fn new() -> Self {
        RandomTraffic { send_probability: 0.3 }
    }
}

impl Default for RandomTraffic {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for RandomTraffic {
    fn run(&mut self, nodes: &mut LiveNodes<'_>, step_count: u64) {
        let ids = nodes.ids();

        if nodes.rng().gen_bool(self.send_probability) && !ids.is_empty() {
            let sender = nodes.rng().choose(&ids).cloned();
            if let Some(sender) = sender {
                let peers: Vec<NodeId> = ids.iter().filter(|id| **id != sender).cloned().collect();
                let target = nodes.rng().choose(&peers).cloned();
                if let (Some(target), Some(mut node)) = (target, nodes.get_mut(&sender)) {
                    node.send(&target, format!("PING-{}", step_count));
                }
            }
        }

        for id in &ids {
            let Some(mut node) = nodes.get_mut(id) else {
                continue;
            };
            for message in node.drain_inbox() {
                if message.payload.contains("PING") {
                    node.send(&message.from, format!("PONG-{}", step_count));
                }
            }
        }
    }
}
