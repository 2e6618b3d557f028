use super::types::LatencyStats;
use crate::simulator::{MessageId, VirtualTime};
use std::collections::HashMap;

/// Matches sends to receives by message id and keeps the resulting latencies.
#[derive(Debug, Default, Clone)]
pub struct LatencyTracker {
    latencies: Vec<f64>,
    send_times: HashMap<MessageId, VirtualTime>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, msg_id: MessageId, send_time: VirtualTime) {
        self.send_times.insert(msg_id, send_time);
    }

    /// Record a receive and return its latency in seconds. A receive for an
    /// untracked (or already consumed) id is ignored.
    pub fn record_receive(&mut self, msg_id: MessageId, receive_time: VirtualTime) -> Option<f64> {
        let sent = self.send_times.remove(&msg_id)?;
        let latency = receive_time.saturating_since(sent).as_secs_f64();
        self.latencies.push(latency);
        Some(latency)
    }

    /// Sends still waiting for a receive
    pub fn in_flight(&self) -> usize {
        self.send_times.len()
    }

    pub fn samples(&self) -> &[f64] {
        &self.latencies
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats::from_samples(&self.latencies)
    }

    pub fn reset(&mut self) {
        self.latencies.clear();
        self.send_times.clear();
    }
}
