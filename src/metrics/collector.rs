use super::latency::LatencyTracker;
use super::throughput::ThroughputTracker;
use super::types::{MetricsSnapshot, NodeStats};
use crate::simulator::{MessageId, NodeId, VirtualTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Default, Clone)]
struct NodeMetrics {
    latency: LatencyTracker,
    throughput: ThroughputTracker,
    packets_sent: u64,
    packets_received: u64,
    packets_dropped: u64,
}

/// Collects all per-run metrics, globally and per node.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    latency: LatencyTracker,
    throughput: ThroughputTracker,
    nodes: BTreeMap<NodeId, NodeMetrics>,

    packets_sent: u64,
    packets_received: u64,
    packets_dropped: u64,
    sync_violations: u64,
    sync_timeouts: u64,
    node_failures: u64,
    partition_events: u64,
}

#[derive(Serialize)]
struct MetricsExport<'a> {
    timestamp: String,
    simulation_time: f64,
    global_stats: &'a MetricsSnapshot,
    node_stats: &'a BTreeMap<NodeId, NodeStats>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, src: &NodeId, msg_id: MessageId, timestamp: VirtualTime, size_bytes: usize) {
        self.packets_sent += 1;
        self.latency.record_send(msg_id, timestamp);
        self.throughput.record_message(timestamp, size_bytes);

        let node = self.node_entry(src);
        node.packets_sent += 1;
        node.latency.record_send(msg_id, timestamp);
        node.throughput.record_message(timestamp, size_bytes);
    }

    /// A delivery reached `dst`. Latency is credited to the sender `src`.
    pub fn record_receive(&mut self, src: &NodeId, dst: &NodeId, msg_id: MessageId, timestamp: VirtualTime) {
        self.packets_received += 1;
        self.latency.record_receive(msg_id, timestamp);

        if let Some(sender) = self.nodes.get_mut(src) {
            sender.latency.record_receive(msg_id, timestamp);
        }
        self.node_entry(dst).packets_received += 1;
    }

    /// A dropped packet still counts as a send attempt.
    pub fn record_packet_drop(&mut self, src: &NodeId) {
        self.packets_dropped += 1;
        self.packets_sent += 1;

        let node = self.node_entry(src);
        node.packets_dropped += 1;
        node.packets_sent += 1;
    }

    pub fn record_sync_violation(&mut self) {
        self.sync_violations += 1;
    }

    pub fn record_sync_timeout(&mut self) {
        self.sync_timeouts += 1;
    }

    pub fn record_node_failure(&mut self) {
        self.node_failures += 1;
    }

    pub fn record_partition_event(&mut self) {
        self.partition_events += 1;
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped
    }

    pub fn global_stats(&self, now: VirtualTime) -> MetricsSnapshot {
        let delivery_rate = if self.packets_sent > 0 {
            self.packets_received as f64 / self.packets_sent as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            latency: self.latency.stats(),
            throughput: self.throughput.stats(now),
            packets_sent: self.packets_sent,
            packets_received: self.packets_received,
            packets_dropped: self.packets_dropped,
            delivery_rate,
            sync_violations: self.sync_violations,
            sync_timeouts: self.sync_timeouts,
            node_failures: self.node_failures,
            partition_events: self.partition_events,
        }
    }

    /// Stats for a node that has sent, dropped or received at least once.
    pub fn node_stats(&self, node: &NodeId, now: VirtualTime) -> Option<NodeStats> {
        self.nodes.get(node).map(|m| NodeStats {
            latency: m.latency.stats(),
            throughput: m.throughput.stats(now),
            packets_sent: m.packets_sent,
            packets_received: m.packets_received,
            packets_dropped: m.packets_dropped,
        })
    }

    pub fn all_node_stats(&self, now: VirtualTime) -> BTreeMap<NodeId, NodeStats> {
        self.nodes
            .keys()
            .filter_map(|id| self.node_stats(id, now).map(|s| (id.clone(), s)))
            .collect()
    }

    /// Write global and per-node stats as pretty JSON.
    pub fn export_json(&self, path: impl AsRef<Path>, now: VirtualTime) -> std::io::Result<()> {
        let global = self.global_stats(now);
        let nodes = self.all_node_stats(now);
        let export = MetricsExport {
            timestamp: chrono::Local::now().to_rfc3339(),
            simulation_time: now.as_secs_f64(),
            global_stats: &global,
            node_stats: &nodes,
        };

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.flush()
    }

    /// Write the flattened global stats as `Metric,Value` CSV.
    pub fn export_csv(&self, path: impl AsRef<Path>, now: VirtualTime) -> std::io::Result<()> {
        std::fs::write(path, self.global_stats(now).to_csv())
    }

    pub fn reset(&mut self) {
        *self = MetricsCollector::default();
    }

    fn node_entry(&mut self, node: &NodeId) -> &mut NodeMetrics {
        self.nodes.entry(node.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (NodeId, NodeId) {
        (NodeId::from("R1-S1"), NodeId::from("R2-S1"))
    }

    #[test]
    fn test_delivery_rate_counts_drops_as_sends() {
        let (a, b) = ids();
        let mut metrics = MetricsCollector::new();
        metrics.record_send(&a, MessageId(1), VirtualTime::ZERO, 4);
        metrics.record_packet_drop(&a);
        metrics.record_receive(&a, &b, MessageId(1), VirtualTime::from_secs(1));

        let stats = metrics.global_stats(VirtualTime::from_secs(1));
        assert_eq!(stats.packets_sent, 2);
        assert_eq!(stats.packets_dropped, 1);
        assert_eq!(stats.delivery_rate, 0.5);
        assert_eq!(stats.latency.avg, 1.0);
    }

    #[test]
    fn test_nothing_sent_has_zero_delivery_rate() {
        let metrics = MetricsCollector::new();
        let stats = metrics.global_stats(VirtualTime::ZERO);
        assert_eq!(stats.delivery_rate, 0.0);
        assert_eq!(stats.latency.count, 0);
    }

    #[test]
    fn test_node_stats_credit_sender_latency() {
        let (a, b) = ids();
        let mut metrics = MetricsCollector::new();
        metrics.record_send(&a, MessageId(7), VirtualTime::from_secs(2), 10);
        metrics.record_receive(&a, &b, MessageId(7), VirtualTime::from_millis(2500));

        let now = VirtualTime::from_millis(2500);
        let sender = metrics.node_stats(&a, now).unwrap();
        assert_eq!(sender.latency.count, 1);
        assert_eq!(sender.packets_sent, 1);

        let receiver = metrics.node_stats(&b, now).unwrap();
        assert_eq!(receiver.latency.count, 0);
        assert_eq!(receiver.packets_received, 1);

        assert!(metrics.node_stats(&NodeId::from("R9-S9"), now).is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let (a, _) = ids();
        let mut metrics = MetricsCollector::new();
        metrics.record_send(&a, MessageId(1), VirtualTime::ZERO, 1);
        metrics.record_node_failure();
        metrics.record_partition_event();
        metrics.reset();

        let stats = metrics.global_stats(VirtualTime::ZERO);
        assert_eq!(stats, MetricsSnapshot::default());
        assert!(metrics.all_node_stats(VirtualTime::ZERO).is_empty());
    }
}
