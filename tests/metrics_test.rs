//! Metrics Integration Tests
//!
//! End-to-end latency and throughput accounting through the simulator, the
//! per-node view and file export.

use datacenter_sim::metrics::MetricsCollector;
use datacenter_sim::simulator::{MessageId, NodeSpec};
use datacenter_sim::{Duration, NodeId, SimulationConfig, Simulator, VirtualTime};

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn sim() -> Simulator {
    let mut sim = Simulator::new(SimulationConfig::calm().shared());
    for node in ["A", "B", "C"] {
        sim.add_node(NodeSpec::new(node, "Rack1"));
    }
    sim
}

// ============================================================================
// Through the simulator
// ============================================================================

#[test]
fn test_latency_of_delivered_messages() {
    let mut sim = sim();
    for _ in 0..4 {
        sim.node_mut(&id("A")).unwrap().send(&id("B"), "x");
    }
    sim.step(Duration::from_secs(1));

    let stats = sim.global_stats();
    assert_eq!(stats.packets_sent, 4);
    assert_eq!(stats.packets_received, 4);
    assert_eq!(stats.delivery_rate, 1.0);
    assert_eq!(stats.latency.count, 4);
    assert_eq!(stats.latency.min, 0.5);
    assert_eq!(stats.latency.max, 0.5);
    assert_eq!(stats.latency.p99, 0.5);
}

#[test]
fn test_throughput_window_trails_current_time() {
    let mut sim = sim();
    for _ in 0..3 {
        sim.node_mut(&id("A")).unwrap().send(&id("B"), "four");
    }

    let stats = sim.global_stats();
    assert_eq!(stats.throughput.total_messages, 3);
    assert_eq!(stats.throughput.messages_per_second, 3.0);
    assert_eq!(stats.throughput.bytes_per_second, 12.0);

    sim.step(Duration::from_secs(2));
    assert_eq!(sim.global_stats().throughput.total_messages, 0);
}

#[test]
fn test_delivery_rate_counts_partition_drops() {
    let mut sim = sim();
    sim.create_partition([id("A")].into_iter().collect(), [id("B")].into_iter().collect());
    sim.node_mut(&id("A")).unwrap().send(&id("B"), "dropped");
    sim.heal_partition();
    sim.node_mut(&id("A")).unwrap().send(&id("B"), "delivered");
    sim.step(Duration::from_secs(1));

    let stats = sim.global_stats();
    assert_eq!(stats.packets_sent, 2);
    assert_eq!(stats.packets_dropped, 1);
    assert_eq!(stats.packets_received, 1);
    assert_eq!(stats.delivery_rate, 0.5);
    assert_eq!(stats.partition_events, 1);
}

#[test]
fn test_node_stats_cover_every_node() {
    let mut sim = sim();
    sim.node_mut(&id("A")).unwrap().send(&id("B"), "x");
    sim.step(Duration::from_secs(1));

    let nodes = sim.node_stats();
    assert_eq!(nodes.len(), 3);

    let a = &nodes[&id("A")];
    assert_eq!(a.packets_sent, 1);
    assert_eq!(a.latency.count, 1);
    assert_eq!(a.latency.avg, 0.5);

    let b = &nodes[&id("B")];
    assert_eq!(b.packets_received, 1);
    assert_eq!(b.packets_sent, 0);
    assert_eq!(b.latency.count, 0);

    let c = &nodes[&id("C")];
    assert_eq!(c.packets_sent, 0);
    assert_eq!(c.throughput.time_window, 1.0);
}

// ============================================================================
// Collector
// ============================================================================

#[test]
fn test_unmatched_receive_adds_no_latency() {
    let mut collector = MetricsCollector::new();
    collector.record_receive(&id("A"), &id("B"), MessageId(42), VirtualTime::from_secs(1));

    let stats = collector.global_stats(VirtualTime::from_secs(1));
    assert_eq!(stats.packets_received, 1);
    assert_eq!(stats.latency.count, 0);
    assert_eq!(stats.delivery_rate, 0.0);
}

#[test]
fn test_reset_clears_everything() {
    let mut collector = MetricsCollector::new();
    collector.record_send(&id("A"), MessageId(0), VirtualTime::ZERO, 10);
    collector.record_sync_timeout();
    collector.record_node_failure();
    collector.reset();

    let stats = collector.global_stats(VirtualTime::ZERO);
    assert_eq!(stats.packets_sent, 0);
    assert_eq!(stats.sync_timeouts, 0);
    assert_eq!(stats.node_failures, 0);
    assert!(collector.node_stats(&id("A"), VirtualTime::ZERO).is_none());
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_json() {
    let mut sim = sim();
    sim.node_mut(&id("A")).unwrap().send(&id("C"), "x");
    sim.step(Duration::from_secs(1));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    sim.metrics().export_json(&path, sim.now()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["simulation_time"], 1.0);
    assert_eq!(value["global_stats"]["packets_sent"], 1);
    assert_eq!(value["global_stats"]["latency"]["avg"], 0.5);
    assert_eq!(value["node_stats"]["C"]["packets_received"], 1);
    assert!(value["timestamp"].as_str().is_some());
}

#[test]
fn test_export_csv() {
    let mut sim = sim();
    sim.node_mut(&id("A")).unwrap().send(&id("B"), "x");
    sim.step(Duration::from_secs(1));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.csv");
    sim.metrics().export_csv(&path, sim.now()).unwrap();

    let csv = std::fs::read_to_string(&path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Metric,Value"));
    assert!(csv.lines().any(|l| l == "packets_sent,1"));
    assert!(csv.lines().any(|l| l == "latency_avg,0.5"));
}
