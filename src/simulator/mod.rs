mod time;
mod rng;
mod queue;
mod clock;
mod log;
mod switch;
mod network;
mod node;
mod executor;
pub mod topology;

pub use time::{VirtualTime, Duration};
pub use rng::DeterministicRng;
pub use queue::{EventQueue, DEFAULT_PRIORITY};
pub use clock::ClockDrift;
pub use log::{EventLog, LogEntry, LogTag, NETWORK_SOURCE};
pub use switch::{Switch, SwitchKind};
pub use network::{MessageRecord, Network, MESSAGE_HISTORY_LIMIT};
pub use node::{Node, NodeFault, NodeMut, NodeSpec, NodeState, StoreValue, HW_FAULTS};
pub use executor::{LiveNodes, SimCore, Simulator};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a simulated server, e.g. `R1-S3`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Unique id of one message within a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Message envelope as it travels through the network and sits in an inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub from: NodeId,
    pub to: NodeId,
    pub payload: String,
    pub sent_at: VirtualTime,
}

impl Message {
    /// Size used for throughput accounting
    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

/// The finite set of operations the scheduler can run.
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    /// Hand a message to its destination node
    DeliverMessage(Message),
    /// One unit of inbox processing completes on a node
    FinishProcessing { node: NodeId },
    /// A node-local timer expires
    FireTimer {
        node: NodeId,
        timer_id: String,
        generation: u64,
    },
    /// A pending sync send gives up waiting for its ack
    SyncTimeout { node: NodeId, msg_id: MessageId },
    /// The ack for a sync send reaches the original sender
    DeliverAck { node: NodeId, msg_id: MessageId },
    /// Split the network into two isolated groups
    CreatePartition {
        group_a: BTreeSet<NodeId>,
        group_b: BTreeSet<NodeId>,
    },
    /// Remove the active partition plan
    HealPartition,
}

impl EventAction {
    pub fn kind(&self) -> &'static str {
        match self {
            EventAction::DeliverMessage(_) => "deliver_message",
            EventAction::FinishProcessing { .. } => "finish_processing",
            EventAction::FireTimer { .. } => "fire_timer",
            EventAction::SyncTimeout { .. } => "sync_timeout",
            EventAction::DeliverAck { .. } => "deliver_ack",
            EventAction::CreatePartition { .. } => "create_partition",
            EventAction::HealPartition => "heal_partition",
        }
    }
}

/// A scheduled action. Ordered by time, then priority, then insertion
/// sequence; the action itself never takes part in ordering.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: VirtualTime,
    pub priority: i32,
    pub seq: u64,
    pub action: EventAction,
}

impl Event {
    fn key(&self) -> (VirtualTime, i32, u64) {
        (self.time, self.priority, self.seq)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // Reversed so BinaryHeap pops the earliest event first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}
