use super::network::Network;
use super::node::{Node, NodeMut, NodeSpec};
use super::*;
use crate::algorithm::{AlgorithmController, AlgorithmRegistry, LoadOutcome, Selection};
use crate::config::{SharedConfig, SimulationConfig};
use crate::faults::FaultStats;
use crate::metrics::{MetricsCollector, MetricsSnapshot, NodeStats};
use parking_lot::RwLockReadGuard;
use std::collections::{BTreeMap, BTreeSet};

/// Services every simulated component needs: the clock, the event queue,
/// randomness, live configuration, metrics and the event log.
#[derive(Debug)]
pub struct SimCore {
    time: VirtualTime,
    queue: EventQueue,
    rng: DeterministicRng,
    config: SharedConfig,
    metrics: MetricsCollector,
    faults: FaultStats,
    clock_drift: ClockDrift,
    log: EventLog,
    next_message_id: u64,
}

impl SimCore {
    pub fn new(config: SharedConfig) -> Self {
        let (seed, log_capacity) = {
            let c = config.read();
            (c.seed, c.log_capacity)
        };
        SimCore {
            time: VirtualTime::ZERO,
            queue: EventQueue::new(),
            rng: DeterministicRng::new(seed),
            config,
            metrics: MetricsCollector::new(),
            faults: FaultStats::new(),
            clock_drift: ClockDrift::new(),
            log: EventLog::new(log_capacity),
            next_message_id: 0,
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.time
    }

    /// Read the live configuration. Keep the guard short-lived.
    pub fn config(&self) -> RwLockReadGuard<'_, SimulationConfig> {
        self.config.read()
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn schedule(&mut self, delay: Duration, action: EventAction) {
        self.schedule_with_priority(delay, DEFAULT_PRIORITY, action);
    }

    pub fn schedule_with_priority(&mut self, delay: Duration, priority: i32, action: EventAction) {
        self.queue.push(self.time + delay, priority, action);
    }

    /// Schedule with a float delay in seconds. Negative or non-finite delays
    /// are ignored and reported as `false`.
    pub fn schedule_secs(&mut self, delay: f64, action: EventAction) -> bool {
        match Duration::try_from_secs_f64(delay) {
            Some(delay) => {
                self.schedule(delay, action);
                true
            }
            None => {
                tracing::debug!(delay, kind = action.kind(), "ignoring event with invalid delay");
                false
            }
        }
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// Take a probabilistic fault decision, counted in the fault stats.
    pub fn roll(&mut self, fault_id: &str, probability: f64) -> bool {
        self.faults.roll(fault_id, probability, &mut self.rng)
    }

    pub fn faults(&self) -> &FaultStats {
        &self.faults
    }

    pub fn faults_mut(&mut self) -> &mut FaultStats {
        &mut self.faults
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsCollector {
        &mut self.metrics
    }

    pub fn log(&mut self, source: &str, tag: Option<LogTag>, message: String) {
        self.log.record(self.time, source, tag, message);
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.entries()
    }

    pub fn next_message_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    /// Node-local time in seconds
    pub fn local_time(&mut self, node: &NodeId) -> f64 {
        let max_drift = self.config.read().max_clock_drift;
        self.clock_drift.local_time(node, self.time, max_drift, &mut self.rng)
    }

    fn forget_node(&mut self, node: &NodeId) {
        self.clock_drift.forget(node);
    }

    fn reset(&mut self) {
        let (seed, log_capacity) = {
            let c = self.config.read();
            (c.seed, c.log_capacity)
        };
        self.time = VirtualTime::ZERO;
        self.queue.clear();
        self.rng = DeterministicRng::new(seed);
        self.metrics.reset();
        self.faults = FaultStats::new();
        self.clock_drift.reset();
        self.log.clear();
        self.log.set_capacity(log_capacity);
        self.next_message_id = 0;
    }
}

/// The nodes offered to an algorithm for one step.
pub struct LiveNodes<'a> {
    nodes: &'a mut BTreeMap<NodeId, Node>,
    core: &'a mut SimCore,
    network: &'a mut Network,
}

impl<'a> LiveNodes<'a> {
    /// Ids in a stable order
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<NodeMut<'_>> {
        let node = self.nodes.get_mut(id)?;
        Some(NodeMut {
            node,
            core: &mut *self.core,
            network: &mut *self.network,
        })
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        self.core.rng()
    }

    pub fn now(&self) -> VirtualTime {
        self.core.now()
    }
}

/// One independent simulation: clock, network, nodes and the algorithm
/// driving them.
#[derive(Debug)]
pub struct Simulator {
    core: SimCore,
    network: Network,
    nodes: BTreeMap<NodeId, Node>,
    controller: AlgorithmController,
    initial_nodes: Vec<NodeSpec>,
}

impl Simulator {
    pub fn new(config: SharedConfig) -> Self {
        Simulator {
            core: SimCore::new(config),
            network: Network::default(),
            nodes: BTreeMap::new(),
            controller: AlgorithmController::new(),
            initial_nodes: Vec::new(),
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.core.now()
    }

    pub fn core(&self) -> &SimCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut SimCore {
        &mut self.core
    }

    pub fn config(&self) -> &SharedConfig {
        self.core.shared_config()
    }

    /// Replace the network, re-placing every current node in it.
    pub fn register_network(&mut self, mut network: Network) {
        for node in self.nodes.values() {
            network.place_node(node.id.clone(), node.rack_id.clone());
        }
        self.network = network;
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn register_switch(&mut self, switch: Switch) {
        self.network.register_switch(switch);
    }

    /// Create a node. An existing node with the same id is replaced.
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.insert_node(&spec);
        self.core.log(id.as_str(), None, "Server added".to_string());
        id
    }

    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        if self.nodes.remove(id).is_none() {
            tracing::debug!(node = %id, "remove_node: unknown node");
            return false;
        }
        self.network.unplace_node(id);
        self.core.forget_node(id);
        self.core.log(id.as_str(), None, "Server removed".to_string());
        true
    }

    /// Shut a running node down, or restart a shut-down one.
    pub fn toggle_node_power(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            tracing::debug!(node = %id, "toggle_node_power: unknown node");
            return false;
        };
        if node.is_shutdown() {
            node.power_on(&mut self.core);
        } else {
            node.power_off(&mut self.core);
        }
        true
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<NodeMut<'_>> {
        let node = self.nodes.get_mut(id)?;
        Some(NodeMut {
            node,
            core: &mut self.core,
            network: &mut self.network,
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn schedule(&mut self, delay: Duration, action: EventAction) {
        self.core.schedule(delay, action);
    }

    pub fn schedule_secs(&mut self, delay: f64, action: EventAction) -> bool {
        self.core.schedule_secs(delay, action)
    }

    /// Run every event due within `dt`, then land the clock on `now + dt`.
    pub fn step(&mut self, dt: Duration) {
        let target = self.core.time + dt;
        while let Some(event) = self.core.queue.pop_due(target) {
            self.core.time = event.time;
            self.dispatch(event.action);
        }
        self.core.time = target;
    }

    pub fn step_secs(&mut self, dt: f64) {
        match Duration::try_from_secs_f64(dt) {
            Some(dt) => self.step(dt),
            None => tracing::debug!(dt, "ignoring step with invalid duration"),
        }
    }

    /// Execute up to `max_events` pending events regardless of their time.
    /// Returns how many ran.
    pub fn drain_events(&mut self, max_events: usize) -> usize {
        let mut executed = 0;
        while executed < max_events {
            let Some(event) = self.core.queue.pop_due(VirtualTime(u64::MAX)) else {
                break;
            };
            self.core.time = event.time;
            self.dispatch(event.action);
            executed += 1;
        }
        executed
    }

    fn dispatch(&mut self, action: EventAction) {
        match action {
            EventAction::DeliverMessage(message) => self.deliver(message),
            EventAction::FinishProcessing { node } => {
                if let Some(node) = self.nodes.get_mut(&node) {
                    node.finish_processing();
                }
            }
            EventAction::FireTimer {
                node,
                timer_id,
                generation,
            } => self.fire_timer(&node, &timer_id, generation),
            EventAction::SyncTimeout { node, msg_id } => {
                if let Some(node) = self.nodes.get_mut(&node) {
                    node.handle_sync_timeout(msg_id, &mut self.core);
                }
            }
            EventAction::DeliverAck { node, msg_id } => {
                if let Some(node) = self.nodes.get_mut(&node) {
                    node.handle_sync_ack(msg_id, &mut self.core);
                }
            }
            EventAction::CreatePartition { group_a, group_b } => {
                self.network.create_partition(&mut self.core, group_a, group_b);
            }
            EventAction::HealPartition => self.network.heal_partition(&mut self.core),
        }
    }

    fn deliver(&mut self, message: Message) {
        let Some(node) = self.nodes.get_mut(&message.to) else {
            tracing::debug!(to = %message.to, id = %message.id, "delivery to unknown node dropped");
            return;
        };
        let now = self.core.now();
        self.core
            .metrics_mut()
            .record_receive(&message.from, &message.to, message.id, now);
        node.receive_message(message, &mut self.core);
    }

    fn fire_timer(&mut self, node_id: &NodeId, timer_id: &str, generation: u64) {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return;
        };
        let Some(callback) = node.take_timer(timer_id, generation) else {
            return;
        };
        self.core.log(node_id.as_str(), None, format!("Timer {} fired", timer_id));
        let mut handle = NodeMut {
            node,
            core: &mut self.core,
            network: &mut self.network,
        };
        callback(&mut handle);
    }

    pub fn live_nodes(&mut self) -> LiveNodes<'_> {
        LiveNodes {
            nodes: &mut self.nodes,
            core: &mut self.core,
            network: &mut self.network,
        }
    }

    pub fn load_algorithms(&mut self, registry: &AlgorithmRegistry) {
        for (name, outcome) in registry.discover() {
            match outcome {
                LoadOutcome::Loaded(algorithm) => self.controller.register_algorithm(name, algorithm),
                LoadOutcome::Invalid(reason) => {
                    tracing::warn!(algorithm = %name, %reason, "algorithm failed to load");
                    self.controller.record_error(name, reason);
                }
            }
        }
    }

    pub fn controller(&self) -> &AlgorithmController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AlgorithmController {
        &mut self.controller
    }

    /// Select the algorithm to run. An invalid selection pauses execution and
    /// resets the simulation when `reset_on_error` is set.
    pub fn set_active_algorithm(&mut self, name: &str) -> Selection {
        let reset_on_error = self.core.config().reset_on_error;
        let selection = self.controller.set_active(name, reset_on_error);
        if let Selection::Paused { reason, reset } = &selection {
            tracing::warn!(algorithm = name, %reason, "algorithm paused");
            if *reset {
                self.reset();
            }
        }
        selection
    }

    pub fn execute_algorithm(&mut self, step_count: u64) {
        let mut live = LiveNodes {
            nodes: &mut self.nodes,
            core: &mut self.core,
            network: &mut self.network,
        };
        self.controller.execute(&mut live, step_count);
    }

    pub fn update_nodes(&mut self) {
        for node in self.nodes.values_mut() {
            node.update_metrics(&mut self.core);
        }
    }

    pub fn update_switches(&mut self) {
        self.network.update_switches();
    }

    /// One simulated second: events, then the algorithm, then node and
    /// switch updates.
    pub fn run_second(&mut self, step_count: u64) {
        self.step(Duration::from_secs(1));
        self.execute_algorithm(step_count);
        self.update_nodes();
        self.update_switches();
    }

    /// Remember the current node set as the state `reset` returns to.
    pub fn save_initial_state(&mut self) {
        self.initial_nodes = self.nodes.values().map(Node::spec).collect();
    }

    pub fn initial_state(&self) -> &[NodeSpec] {
        &self.initial_nodes
    }

    /// Return to time zero with the saved node set and a reseeded RNG.
    pub fn reset(&mut self) {
        tracing::info!(nodes = self.initial_nodes.len(), "resetting simulation");
        self.core.reset();
        self.network.reset();
        self.nodes.clear();
        let specs = self.initial_nodes.clone();
        for spec in &specs {
            self.insert_node(spec);
        }
    }

    pub fn create_partition(&mut self, group_a: BTreeSet<NodeId>, group_b: BTreeSet<NodeId>) {
        self.network.create_partition(&mut self.core, group_a, group_b);
    }

    pub fn heal_partition(&mut self) {
        self.network.heal_partition(&mut self.core);
    }

    /// Partition `group_a | group_b` after `at`, healing `duration` later.
    pub fn schedule_partition(
        &mut self,
        at: Duration,
        duration: Duration,
        group_a: BTreeSet<NodeId>,
        group_b: BTreeSet<NodeId>,
    ) {
        self.core.schedule(at, EventAction::CreatePartition { group_a, group_b });
        self.core.schedule(at + duration, EventAction::HealPartition);
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogEntry> {
        self.core.log_entries()
    }

    pub fn message_history(&self) -> impl Iterator<Item = &MessageRecord> {
        self.network.history()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        self.core.metrics()
    }

    pub fn fault_stats(&self) -> &FaultStats {
        self.core.faults()
    }

    pub fn global_stats(&self) -> MetricsSnapshot {
        self.core.metrics().global_stats(self.core.now())
    }

    /// Per-node stats for every current node; nodes without traffic report zeros.
    pub fn node_stats(&self) -> BTreeMap<NodeId, NodeStats> {
        let now = self.core.now();
        self.nodes
            .keys()
            .map(|id| (id.clone(), self.core.metrics().node_stats(id, now).unwrap_or_default()))
            .collect()
    }

    fn insert_node(&mut self, spec: &NodeSpec) -> NodeId {
        let node = Node::new(spec, self.core.rng());
        let id = node.id.clone();
        self.network.place_node(id.clone(), node.rack_id.clone());
        self.nodes.insert(id.clone(), node);
        id
    }
}
