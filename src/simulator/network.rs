use super::executor::SimCore;
use super::{Duration, EventAction, LogTag, Message, MessageId, NodeId, Switch, SwitchKind, VirtualTime, NETWORK_SOURCE};
use crate::faults;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Messages kept in the network's send history
pub const MESSAGE_HISTORY_LIMIT: usize = 10_000;

/// Fixed extra delay for any route that crosses the spine
const INTER_RACK_OVERHEAD: Duration = Duration(100_000);
/// Jittered delays never drop below this
const MIN_JITTERED_DELAY: f64 = 0.001;
/// Bounds of the extra delay given to a reordered message, in seconds
const REORDER_DELAY: (f64, f64) = (0.1, 0.5);

const DEFAULT_SPINE_ID: &str = "Spine-Switch";

/// One accepted send, as kept in the message history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub time: VirtualTime,
    pub src: NodeId,
    pub dst: NodeId,
    pub payload: String,
    pub sync: bool,
    pub msg_id: MessageId,
}

/// Logical leaf-spine network: routing, partitions and per-packet faults.
#[derive(Debug)]
pub struct Network {
    latency: Duration,
    switches: BTreeMap<String, Switch>,
    partitions: Vec<BTreeSet<NodeId>>,
    placements: HashMap<NodeId, String>,
    history: VecDeque<MessageRecord>,
}

impl Default for Network {
    fn default() -> Self {
        Network::new(Duration::from_millis(500))
    }
}

impl Network {
    pub fn new(latency: Duration) -> Self {
        Network {
            latency,
            switches: BTreeMap::new(),
            partitions: Vec::new(),
            placements: HashMap::new(),
            history: VecDeque::new(),
        }
    }

    /// Base one-hop delay
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    pub fn register_switch(&mut self, switch: Switch) {
        self.switches.insert(switch.id.clone(), switch);
        self.recount_attachments();
    }

    pub fn switch(&self, id: &str) -> Option<&Switch> {
        self.switches.get(id)
    }

    pub fn switch_mut(&mut self, id: &str) -> Option<&mut Switch> {
        self.switches.get_mut(id)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    /// Record which rack a node lives in and attach it to that rack's leaf.
    pub fn place_node(&mut self, node: NodeId, rack_id: impl Into<String>) {
        self.placements.insert(node, rack_id.into());
        self.recount_attachments();
    }

    pub fn unplace_node(&mut self, node: &NodeId) {
        if self.placements.remove(node).is_some() {
            self.recount_attachments();
        }
    }

    pub fn rack_of(&self, node: &NodeId) -> Option<&str> {
        self.placements.get(node).map(String::as_str)
    }

    /// Per-second switch utilization decay.
    pub fn update_switches(&mut self) {
        for switch in self.switches.values_mut() {
            switch.update_metrics();
        }
    }

    pub fn partitions(&self) -> &[BTreeSet<NodeId>] {
        &self.partitions
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partitions.is_empty()
    }

    /// True when some partition group contains exactly one of the two nodes.
    pub fn are_partitioned(&self, a: &NodeId, b: &NodeId) -> bool {
        self.partitions
            .iter()
            .any(|group| group.contains(a) != group.contains(b))
    }

    /// Replace the active partition plan with `group_a | group_b`.
    pub fn create_partition(&mut self, core: &mut SimCore, group_a: BTreeSet<NodeId>, group_b: BTreeSet<NodeId>) {
        core.log(
            NETWORK_SOURCE,
            Some(LogTag::Partition),
            format!("Partition created: {} | {}", format_group(&group_a), format_group(&group_b)),
        );
        self.partitions = vec![group_a, group_b];
        core.metrics_mut().record_partition_event();
    }

    pub fn heal_partition(&mut self, core: &mut SimCore) {
        if self.partitions.is_empty() {
            return;
        }
        self.partitions.clear();
        core.log(NETWORK_SOURCE, Some(LogTag::Partition), "Partition healed".to_string());
    }

    /// Route one message from `src` to `dst`.
    ///
    /// Partition and loss are checked once per call, before any routing. On
    /// success the delivery (and for `sync`, the ack back to `src` at twice
    /// the delay) is scheduled and the message id is returned.
    pub fn send(
        &mut self,
        core: &mut SimCore,
        src: &NodeId,
        dst: &NodeId,
        payload: String,
        sync: bool,
        msg_id: Option<MessageId>,
    ) -> Option<MessageId> {
        let msg_id = msg_id.unwrap_or_else(|| core.next_message_id());

        if self.are_partitioned(src, dst) {
            core.log(
                NETWORK_SOURCE,
                Some(LogTag::Partition),
                format!("Message dropped: {} -> {}", src, dst),
            );
            core.metrics_mut().record_packet_drop(src);
            return None;
        }

        let (loss_rate, jitter_range, reorder_probability) = {
            let config = core.config();
            (config.packet_loss_rate, config.jitter_range, config.reorder_probability)
        };

        if loss_rate > 0.0 && core.roll(faults::network::PACKET_LOSS, loss_rate) {
            core.log(
                NETWORK_SOURCE,
                Some(LogTag::PacketLoss),
                format!("Message dropped: {} -> {}", src, dst),
            );
            core.metrics_mut().record_packet_drop(src);
            return None;
        }

        let now = core.now();
        core.metrics_mut().record_send(src, msg_id, now, payload.len());
        self.push_history(MessageRecord {
            time: now,
            src: src.clone(),
            dst: dst.clone(),
            payload: payload.clone(),
            sync,
            msg_id,
        });

        let mut latency = self.routing_latency(src, dst);

        if jitter_range > 0.0 {
            core.faults_mut().record_check(faults::network::JITTER);
            let jitter = core.rng().gen_range_f64(-jitter_range, jitter_range);
            core.faults_mut().record_trigger(faults::network::JITTER);
            let jittered = (latency.as_secs_f64() + jitter).max(MIN_JITTERED_DELAY);
            latency = Duration::from_secs_f64(jittered);
        }

        if reorder_probability > 0.0 && core.roll(faults::network::REORDER, reorder_probability) {
            let extra = core.rng().gen_range_f64(REORDER_DELAY.0, REORDER_DELAY.1);
            latency = latency + Duration::from_secs_f64(extra);
            core.log(
                NETWORK_SOURCE,
                Some(LogTag::Reorder),
                format!("Message delayed: {} -> {}", src, dst),
            );
        }

        core.schedule(
            latency,
            EventAction::DeliverMessage(Message {
                id: msg_id,
                from: src.clone(),
                to: dst.clone(),
                payload,
                sent_at: now,
            }),
        );
        if sync {
            core.schedule(
                latency * 2,
                EventAction::DeliverAck {
                    node: src.clone(),
                    msg_id,
                },
            );
        }

        Some(msg_id)
    }

    pub fn history(&self) -> impl Iterator<Item = &MessageRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop partitions, history and placements; zero switch counters. Base
    /// latency and the switch inventory are kept.
    pub fn reset(&mut self) {
        self.partitions.clear();
        self.history.clear();
        self.placements.clear();
        for switch in self.switches.values_mut() {
            switch.reset_counters();
        }
        self.recount_attachments();
    }

    fn push_history(&mut self, record: MessageRecord) {
        while self.history.len() >= MESSAGE_HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    fn routing_latency(&mut self, src: &NodeId, dst: &NodeId) -> Duration {
        if self.switches.is_empty() {
            return self.latency;
        }
        let (src_rack, dst_rack) = match (self.placements.get(src), self.placements.get(dst)) {
            (Some(s), Some(d)) => (s.clone(), d.clone()),
            _ => return self.latency,
        };

        if src_rack == dst_rack {
            // Ingress and egress through the same leaf
            let leaf = self.leaf_id(&src_rack);
            return match self.switches.get_mut(&leaf) {
                Some(switch) => self.latency + switch.forward_packet() * 2,
                None => self.latency,
            };
        }

        let route = [self.leaf_id(&src_rack), self.spine_id(), self.leaf_id(&dst_rack)];
        let mut switching = Duration::ZERO;
        for hop in &route {
            if let Some(switch) = self.switches.get_mut(hop) {
                switching = switching + switch.forward_packet();
            }
        }
        self.latency + switching + INTER_RACK_OVERHEAD
    }

    fn leaf_id(&self, rack_id: &str) -> String {
        self.switches
            .values()
            .find(|s| s.is_leaf_for(rack_id))
            .map(|s| s.id.clone())
            .unwrap_or_else(|| format!("Leaf-{}", rack_id))
    }

    fn spine_id(&self) -> String {
        self.switches
            .values()
            .find(|s| s.kind == SwitchKind::Spine)
            .map(|s| s.id.clone())
            .unwrap_or_else(|| DEFAULT_SPINE_ID.to_string())
    }

    fn recount_attachments(&mut self) {
        let leaves = self.switches.values().filter(|s| s.kind == SwitchKind::Leaf).count() as u32;
        let placements = &self.placements;
        for switch in self.switches.values_mut() {
            let connections = match (&switch.kind, &switch.rack_id) {
                (SwitchKind::Leaf, Some(rack)) => placements.values().filter(|r| *r == rack).count() as u32,
                (SwitchKind::Leaf, None) => 0,
                (SwitchKind::Spine, _) => leaves,
            };
            switch.set_active_connections(connections);
        }
    }
}

fn format_group(group: &BTreeSet<NodeId>) -> String {
    let ids: Vec<&str> = group.iter().map(NodeId::as_str).collect();
    format!("{{{}}}", ids.join(", "))
}
