use super::executor::SimCore;
use super::network::Network;
use super::{DeterministicRng, Duration, EventAction, LogTag, Message, MessageId, NodeId, VirtualTime};
use crate::config::{SimulationConfig, SyncModel};
use crate::faults;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// Time a node spends processing one delivered message
const PROCESSING_TIME: Duration = Duration(100_000);
/// Hardware faults a node may hold at once before new ones are suppressed
const MAX_CONCURRENT_FAULTS: usize = 3;
const IDLE_CPU_CEILING: f64 = 90.0;
const IDLE_CPU_FLOOR: f64 = 10.0;
const MEMORY_BAND: (f64, f64) = (30.0, 85.0);
const DISK_CEILING: f64 = 98.0;
const DISK_FLOOR: f64 = 20.0;
const LOG_ROTATION_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Idle,
    Processing,
    Shutdown,
}

/// Named condition a node can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeFault {
    HighCpuLoad,
    MemoryExhaustion,
    DiskSpaceLow,
    PowerSupplyWarning,
    NetworkPacketLoss,
}

impl NodeFault {
    pub fn name(&self) -> &'static str {
        match self {
            NodeFault::HighCpuLoad => "High CPU Load",
            NodeFault::MemoryExhaustion => "Memory Exhaustion",
            NodeFault::DiskSpaceLow => "Disk Space Low",
            NodeFault::PowerSupplyWarning => "Power Supply Warning",
            NodeFault::NetworkPacketLoss => "Network Packet Loss",
        }
    }
}

impl fmt::Display for NodeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Faults injected at random, independent of resource gauges
pub const HW_FAULTS: [NodeFault; 2] = [NodeFault::PowerSupplyWarning, NodeFault::NetworkPacketLoss];

/// Creation parameters of a node, also used to rebuild it on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub rack_id: String,
    pub cores: u32,
    pub ram_gb: u32,
}

impl NodeSpec {
    pub fn new(node_id: impl Into<NodeId>, rack_id: impl Into<String>) -> Self {
        NodeSpec {
            node_id: node_id.into(),
            ip_address: None,
            rack_id: rack_id.into(),
            cores: 8,
            ram_gb: 32,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_resources(mut self, cores: u32, ram_gb: u32) -> Self {
        self.cores = cores;
        self.ram_gb = ram_gb;
        self
    }

    /// The configured address, or `192.168.1.<id without its first char>`.
    pub fn resolved_ip(&self) -> String {
        match &self.ip_address {
            Some(ip) => ip.clone(),
            None => {
                let suffix: String = self.node_id.as_str().chars().skip(1).collect();
                format!("192.168.1.{}", suffix)
            }
        }
    }
}

/// Value kept in a node's algorithm store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<StoreValue>),
}

impl StoreValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StoreValue::Float(v) => Some(*v),
            StoreValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        StoreValue::Bool(v)
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        StoreValue::Int(v)
    }
}

impl From<f64> for StoreValue {
    fn from(v: f64) -> Self {
        StoreValue::Float(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        StoreValue::Text(v.to_string())
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        StoreValue::Text(v)
    }
}

pub(crate) type TimerCallback = Box<dyn FnOnce(&mut NodeMut<'_>) + Send>;

struct PendingTimer {
    generation: u64,
    callback: TimerCallback,
}

impl fmt::Debug for PendingTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTimer")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// One simulated server.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub ip_address: String,
    pub rack_id: String,
    pub cores: u32,
    pub ram_gb: u32,

    /// Gauges in percent
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub power_watts: f64,

    pub state: NodeState,
    pub is_critical: bool,
    pub messages_received: u64,

    faults: Vec<NodeFault>,
    inbox: VecDeque<Message>,
    processing_tasks: u32,
    pending_sync_sends: HashMap<MessageId, VirtualTime>,
    timers: HashMap<String, PendingTimer>,
    timer_generation: u64,
    store: BTreeMap<String, StoreValue>,
}

impl Node {
    pub fn new(spec: &NodeSpec, rng: &mut DeterministicRng) -> Self {
        let cpu_usage = rng.gen_range_inclusive(5, 25) as f64;
        let memory_usage = rng.gen_range_inclusive(30, 50) as f64;
        let disk_usage = rng.gen_range_inclusive(40, 60) as f64;

        Node {
            id: spec.node_id.clone(),
            ip_address: spec.resolved_ip(),
            rack_id: spec.rack_id.clone(),
            cores: spec.cores,
            ram_gb: spec.ram_gb,
            cpu_usage,
            memory_usage,
            disk_usage,
            power_watts: base_power(spec.cores, spec.ram_gb),
            state: NodeState::Idle,
            is_critical: false,
            messages_received: 0,
            faults: Vec::new(),
            inbox: VecDeque::new(),
            processing_tasks: 0,
            pending_sync_sends: HashMap::new(),
            timers: HashMap::new(),
            timer_generation: 0,
            store: BTreeMap::new(),
        }
    }

    pub fn spec(&self) -> NodeSpec {
        NodeSpec {
            node_id: self.id.clone(),
            ip_address: Some(self.ip_address.clone()),
            rack_id: self.rack_id.clone(),
            cores: self.cores,
            ram_gb: self.ram_gb,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.state == NodeState::Shutdown
    }

    pub fn faults(&self) -> &[NodeFault] {
        &self.faults
    }

    pub fn has_fault(&self, fault: NodeFault) -> bool {
        self.faults.contains(&fault)
    }

    pub fn inbox(&self) -> impl Iterator<Item = &Message> {
        self.inbox.iter()
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn processing_tasks(&self) -> u32 {
        self.processing_tasks
    }

    pub fn pending_sync_sends(&self) -> usize {
        self.pending_sync_sends.len()
    }

    pub fn has_timer(&self, timer_id: &str) -> bool {
        self.timers.contains_key(timer_id)
    }

    pub fn store(&self) -> &BTreeMap<String, StoreValue> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BTreeMap<String, StoreValue> {
        &mut self.store
    }

    /// Advance gauges and faults by one simulated second.
    pub fn update_metrics(&mut self, core: &mut SimCore) {
        if self.is_shutdown() {
            self.cpu_usage = 0.0;
            self.memory_usage = 0.0;
            self.faults.clear();
            return;
        }

        let config = core.config().clone();

        if self.state == NodeState::Processing {
            self.cpu_usage = (self.cpu_usage + core.rng().gen_range_inclusive(20, 50) as f64).min(100.0);
        } else if core.roll(faults::node::IDLE_SPIKE, config.idle_spike_prob) {
            self.cpu_usage = (self.cpu_usage + core.rng().gen_range_inclusive(5, 20) as f64).min(IDLE_CPU_CEILING);
        } else {
            self.cpu_usage = (self.cpu_usage - core.rng().gen_range_inclusive(5, 15) as f64).max(IDLE_CPU_FLOOR);
        }

        let memory_step = core.rng().gen_range_inclusive(-5, 5) as f64;
        self.memory_usage = (self.memory_usage + memory_step).clamp(MEMORY_BAND.0, MEMORY_BAND.1);

        let growth = core.rng().gen_range_f64(0.0, config.disk_growth_rate);
        self.disk_usage = (self.disk_usage + growth).min(DISK_CEILING);

        if self.disk_usage > LOG_ROTATION_THRESHOLD && core.roll(faults::node::LOG_ROTATION, config.log_rotation_prob) {
            let freed = core.rng().gen_range_inclusive(10, 30) as f64;
            self.disk_usage = (self.disk_usage - freed).max(DISK_FLOOR);
        }

        self.power_watts = base_power(self.cores, self.ram_gb) * (0.3 + 0.7 * (self.cpu_usage / 100.0));

        self.is_critical = false;
        let threshold = config.critical_threshold;
        self.check_threshold(core, NodeFault::HighCpuLoad, "CPU", self.cpu_usage, threshold);
        self.check_threshold(core, NodeFault::MemoryExhaustion, "Memory", self.memory_usage, threshold);
        self.check_threshold(core, NodeFault::DiskSpaceLow, "Disk", self.disk_usage, threshold);

        if core.roll(faults::node::HW_FAULT, config.hw_fault_prob) && self.faults.len() < MAX_CONCURRENT_FAULTS {
            let picked = core.rng().choose(&HW_FAULTS).copied();
            if let Some(fault) = picked.filter(|f| !self.has_fault(*f)) {
                self.faults.push(fault);
                self.is_critical = true;
                core.log(self.id.as_str(), Some(LogTag::Fault), format!("Generated {}", fault));
            }
        }

        for fault in HW_FAULTS {
            if self.has_fault(fault) && core.roll(faults::node::FAULT_CLEAR, config.fault_clear_prob) {
                self.faults.retain(|f| *f != fault);
                core.log(self.id.as_str(), Some(LogTag::Fault), format!("Cleared {}", fault));
            }
        }

        if !self.faults.is_empty() {
            self.is_critical = true;
        }

        if self.has_fault(NodeFault::PowerSupplyWarning)
            && core.roll(faults::node::POWER_FAILURE, config.power_failure_prob)
        {
            self.state = NodeState::Shutdown;
            self.faults.clear();
            self.cpu_usage = 0.0;
            self.memory_usage = 0.0;
            core.metrics_mut().record_node_failure();
            core.log(
                self.id.as_str(),
                Some(LogTag::Shutdown),
                format!("Power supply died (prob={})", config.power_failure_prob),
            );
        }
    }

    fn check_threshold(&mut self, core: &mut SimCore, fault: NodeFault, gauge: &str, value: f64, threshold: f64) {
        if value > threshold {
            self.is_critical = true;
            if !self.has_fault(fault) {
                self.faults.push(fault);
                core.log(
                    self.id.as_str(),
                    Some(LogTag::Critical),
                    format!("{} {:.1}% > {}%", gauge, value, threshold),
                );
            }
        } else {
            self.faults.retain(|f| *f != fault);
        }
    }

    /// Accept a delivered message. Shut-down nodes drop it.
    pub fn receive_message(&mut self, message: Message, core: &mut SimCore) {
        if self.is_shutdown() {
            return;
        }

        self.messages_received += 1;
        self.state = NodeState::Processing;
        core.log(
            self.id.as_str(),
            None,
            format!("Received {} from {}", message.payload, message.from),
        );
        self.inbox.push_back(message);

        self.processing_tasks += 1;
        core.schedule(PROCESSING_TIME, EventAction::FinishProcessing { node: self.id.clone() });
    }

    pub fn finish_processing(&mut self) {
        self.processing_tasks = self.processing_tasks.saturating_sub(1);
        if self.processing_tasks == 0 && !self.is_shutdown() {
            self.state = NodeState::Idle;
        }
    }

    /// Fire-and-forget send. Does nothing when shut down or without a target.
    pub fn send(
        &mut self,
        core: &mut SimCore,
        network: &mut Network,
        target: Option<&NodeId>,
        payload: String,
    ) -> Option<MessageId> {
        if self.is_shutdown() {
            return None;
        }
        let target = target?;
        core.log(self.id.as_str(), None, format!("Sending {} to {}", payload, target));
        network.send(core, &self.id, target, payload, false, None)
    }

    /// Attempt a synchronous send.
    ///
    /// Returns whether the send went out as a tracked synchronous call. The
    /// outcome arrives later as an ack or a timeout, whichever fires first.
    pub fn sync_send(
        &mut self,
        core: &mut SimCore,
        network: &mut Network,
        target: Option<&NodeId>,
        payload: String,
        timeout: Option<Duration>,
    ) -> bool {
        if self.is_shutdown() {
            return false;
        }
        let Some(target) = target else {
            return false;
        };

        let (sync_model, violation_prob, default_timeout) = {
            let config = core.config();
            (config.sync_model, config.sync_violation_prob, config.sync_timeout)
        };
        let timeout = timeout.unwrap_or_else(|| sync_timeout_from_secs(default_timeout));

        let violated = sync_model == SyncModel::Asynchronous
            || (violation_prob > 0.0 && core.roll(faults::sync::VIOLATION, violation_prob));
        if violated {
            core.log(
                self.id.as_str(),
                Some(LogTag::SyncViolation),
                "sync_send degraded to async".to_string(),
            );
            core.metrics_mut().record_sync_violation();
            self.send(core, network, Some(target), payload);
            return false;
        }

        let msg_id = core.next_message_id();
        core.log(self.id.as_str(), None, format!("Sync sending {} to {}", payload, target));
        self.pending_sync_sends.insert(msg_id, core.now());
        core.schedule(
            timeout,
            EventAction::SyncTimeout {
                node: self.id.clone(),
                msg_id,
            },
        );
        network.send(core, &self.id, target, payload, true, Some(msg_id));
        true
    }

    pub fn handle_sync_timeout(&mut self, msg_id: MessageId, core: &mut SimCore) {
        if self.pending_sync_sends.remove(&msg_id).is_some() {
            core.log(
                self.id.as_str(),
                Some(LogTag::Timeout),
                format!("sync_send timed out: {}", msg_id),
            );
            core.metrics_mut().record_sync_timeout();
        }
    }

    pub fn handle_sync_ack(&mut self, msg_id: MessageId, core: &mut SimCore) {
        if self.pending_sync_sends.remove(&msg_id).is_some() {
            core.log(
                self.id.as_str(),
                Some(LogTag::Ack),
                format!("sync_send acknowledged: {}", msg_id),
            );
        }
    }

    /// Arm a one-shot timer. Re-arming an id supersedes the earlier firing.
    pub fn set_timer<F>(&mut self, core: &mut SimCore, timer_id: impl Into<String>, delay: Duration, callback: F)
    where
        F: FnOnce(&mut NodeMut<'_>) + Send + 'static,
    {
        if self.is_shutdown() {
            return;
        }
        let timer_id = timer_id.into();
        self.timer_generation += 1;
        let generation = self.timer_generation;

        core.log(self.id.as_str(), None, format!("Set timer {} for {}", timer_id, delay));
        self.timers.insert(
            timer_id.clone(),
            PendingTimer {
                generation,
                callback: Box::new(callback),
            },
        );
        core.schedule(
            delay,
            EventAction::FireTimer {
                node: self.id.clone(),
                timer_id,
                generation,
            },
        );
    }

    pub fn cancel_timer(&mut self, core: &mut SimCore, timer_id: &str) -> bool {
        if self.timers.remove(timer_id).is_some() {
            core.log(self.id.as_str(), None, format!("Cancelled timer {}", timer_id));
            true
        } else {
            false
        }
    }

    /// Claim the callback for a firing, if it is still the current arming.
    pub(crate) fn take_timer(&mut self, timer_id: &str, generation: u64) -> Option<TimerCallback> {
        match self.timers.get(timer_id) {
            Some(timer) if timer.generation == generation => self.timers.remove(timer_id).map(|t| t.callback),
            _ => None,
        }
    }

    pub fn power_off(&mut self, core: &mut SimCore) {
        self.state = NodeState::Shutdown;
        core.log(self.id.as_str(), None, "Server shutdown".to_string());
    }

    /// Restart into IDLE with faults and outstanding work cleared.
    pub fn power_on(&mut self, core: &mut SimCore) {
        self.state = NodeState::Idle;
        self.faults.clear();
        self.is_critical = false;
        self.processing_tasks = 0;
        core.log(self.id.as_str(), None, "Server restarted".to_string());
    }
}

fn base_power(cores: u32, ram_gb: u32) -> f64 {
    f64::from(cores * 15 + ram_gb * 2)
}

/// Mutable view of one node together with the simulation services it needs.
pub struct NodeMut<'a> {
    pub(crate) node: &'a mut Node,
    pub(crate) core: &'a mut SimCore,
    pub(crate) network: &'a mut Network,
}

impl<'a> NodeMut<'a> {
    pub fn id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn send(&mut self, target: &NodeId, payload: impl Into<String>) -> Option<MessageId> {
        self.node.send(self.core, self.network, Some(target), payload.into())
    }

    pub fn sync_send(&mut self, target: &NodeId, payload: impl Into<String>, timeout: Option<Duration>) -> bool {
        self.node.sync_send(self.core, self.network, Some(target), payload.into(), timeout)
    }

    pub fn set_timer<F>(&mut self, timer_id: impl Into<String>, delay: Duration, callback: F)
    where
        F: FnOnce(&mut NodeMut<'_>) + Send + 'static,
    {
        self.node.set_timer(self.core, timer_id, delay, callback);
    }

    pub fn cancel_timer(&mut self, timer_id: &str) -> bool {
        self.node.cancel_timer(self.core, timer_id)
    }

    pub fn pop_message(&mut self) -> Option<Message> {
        self.node.inbox.pop_front()
    }

    pub fn drain_inbox(&mut self) -> Vec<Message> {
        self.node.inbox.drain(..).collect()
    }

    pub fn store(&self) -> &BTreeMap<String, StoreValue> {
        &self.node.store
    }

    pub fn store_mut(&mut self) -> &mut BTreeMap<String, StoreValue> {
        &mut self.node.store
    }

    /// Node-local time in seconds, including clock drift
    pub fn local_time(&mut self) -> f64 {
        self.core.local_time(&self.node.id)
    }

    pub fn now(&self) -> VirtualTime {
        self.core.now()
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        self.core.rng()
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.core.log(self.node.id.as_str(), None, message.into());
    }
}

/// Configured sync timeout as a span. `+inf` never fires; negative or NaN
/// settings fall back to the default timeout.
fn sync_timeout_from_secs(secs: f64) -> Duration {
    if secs == f64::INFINITY {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(secs).unwrap_or_else(|| {
        let fallback = SimulationConfig::default().sync_timeout;
        tracing::debug!(secs, fallback, "invalid sync timeout, using default");
        Duration::from_secs_f64(fallback)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(config: SimulationConfig) -> (SimCore, Node) {
        let mut core = SimCore::new(config.shared());
        let node = Node::new(&NodeSpec::new("R1-S1", "Rack1"), core.rng());
        (core, node)
    }

    #[test]
    fn test_sync_timeout_conversion() {
        assert_eq!(sync_timeout_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(sync_timeout_from_secs(f64::INFINITY), Duration::MAX);
        assert_eq!(sync_timeout_from_secs(-2.0), Duration::from_secs(5));
        assert_eq!(sync_timeout_from_secs(f64::NAN), Duration::from_secs(5));
    }

    #[test]
    fn test_initial_gauges_in_range() {
        let (_, node) = setup(SimulationConfig::calm());
        assert!((5.0..=25.0).contains(&node.cpu_usage));
        assert!((30.0..=50.0).contains(&node.memory_usage));
        assert!((40.0..=60.0).contains(&node.disk_usage));
        assert_eq!(node.power_watts, 8.0 * 15.0 + 32.0 * 2.0);
        assert_eq!(node.ip_address, "192.168.1.1-S1");
    }

    #[test]
    fn test_gauges_stay_in_bounds() {
        let (mut core, mut node) = setup(SimulationConfig::calm());
        for _ in 0..500 {
            node.update_metrics(&mut core);
            assert!(node.cpu_usage >= 10.0 && node.cpu_usage <= 90.0);
            assert!(node.memory_usage >= 30.0 && node.memory_usage <= 85.0);
            assert!(node.disk_usage <= 98.0);
        }
    }

    #[test]
    fn test_high_disk_raises_named_fault() {
        let mut config = SimulationConfig::calm();
        config.log_rotation_prob = 0.0;
        config.critical_threshold = 90.0;
        let (mut core, mut node) = setup(config);
        node.disk_usage = 95.0;

        node.update_metrics(&mut core);
        assert!(node.has_fault(NodeFault::DiskSpaceLow));
        assert!(node.is_critical);
        assert_eq!(core.log_entries().filter(|e| e.tag == Some(LogTag::Critical)).count(), 1);

        node.disk_usage = 50.0;
        node.update_metrics(&mut core);
        assert!(!node.has_fault(NodeFault::DiskSpaceLow));
    }

    #[test]
    fn test_power_failure_shuts_node_down() {
        let mut config = SimulationConfig::calm();
        config.power_failure_prob = 1.0;
        config.fault_clear_prob = 0.0;
        let (mut core, mut node) = setup(config);
        node.faults.push(NodeFault::PowerSupplyWarning);

        node.update_metrics(&mut core);
        assert!(node.is_shutdown());
        assert!(node.faults().is_empty());
        assert_eq!(node.cpu_usage, 0.0);
        assert_eq!(core.metrics().global_stats(core.now()).node_failures, 1);

        node.power_on(&mut core);
        assert_eq!(node.state, NodeState::Idle);
    }

    #[test]
    fn test_fault_cap_blocks_new_hw_faults() {
        let mut config = SimulationConfig::calm();
        config.hw_fault_prob = 1.0;
        config.critical_threshold = 0.0;
        let (mut core, mut node) = setup(config);

        // cpu, memory and disk all exceed a zero threshold
        node.update_metrics(&mut core);
        assert_eq!(node.faults().len(), 3);
        assert!(!HW_FAULTS.iter().any(|f| node.has_fault(*f)));
    }

    #[test]
    fn test_overlapping_deliveries_keep_processing() {
        let (mut core, mut node) = setup(SimulationConfig::calm());
        let msg = |id| Message {
            id: MessageId(id),
            from: NodeId::from("R2-S1"),
            to: NodeId::from("R1-S1"),
            payload: "hi".into(),
            sent_at: VirtualTime::ZERO,
        };
        node.receive_message(msg(1), &mut core);
        node.receive_message(msg(2), &mut core);
        assert_eq!(node.processing_tasks(), 2);

        node.finish_processing();
        assert_eq!(node.state, NodeState::Processing);
        node.finish_processing();
        assert_eq!(node.state, NodeState::Idle);
        assert_eq!(node.inbox_len(), 2);
    }

    #[test]
    fn test_shutdown_node_ignores_messages() {
        let (mut core, mut node) = setup(SimulationConfig::calm());
        node.power_off(&mut core);
        node.receive_message(
            Message {
                id: MessageId(1),
                from: NodeId::from("x"),
                to: node.id.clone(),
                payload: "hi".into(),
                sent_at: VirtualTime::ZERO,
            },
            &mut core,
        );
        assert_eq!(node.messages_received, 0);
        assert_eq!(node.inbox_len(), 0);
    }

    #[test]
    fn test_stale_timer_generation_not_taken() {
        let (mut core, mut node) = setup(SimulationConfig::calm());
        node.set_timer(&mut core, "election", Duration::from_secs(1), |_| {});
        node.set_timer(&mut core, "election", Duration::from_secs(2), |_| {});

        assert!(node.take_timer("election", 1).is_none());
        assert!(node.take_timer("election", 2).is_some());
        assert!(!node.has_timer("election"));
    }

    #[test]
    fn test_store_values_roundtrip_json() {
        let (_, mut node) = setup(SimulationConfig::calm());
        node.store_mut().insert("role".into(), "leader".into());
        node.store_mut().insert("term".into(), StoreValue::from(3i64));

        let json = serde_json::to_string(node.store()).unwrap();
        assert_eq!(json, r#"{"role":"leader","term":3}"#);
        assert_eq!(node.store()["role"].as_str(), Some("leader"));
    }
}
