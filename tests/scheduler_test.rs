//! Event Scheduler Integration Tests
//!
//! Ordering of timed events, exact time stepping, leniency for invalid
//! delays and seed-level determinism of whole runs.

use datacenter_sim::simulator::{EventAction, NodeMut, NodeSpec, StoreValue};
use datacenter_sim::{Duration, NodeId, SimulationConfig, Simulator, VirtualTime};

fn two_node_sim() -> Simulator {
    let mut sim = Simulator::new(SimulationConfig::calm().shared());
    sim.add_node(NodeSpec::new("A", "Rack1"));
    sim.add_node(NodeSpec::new("B", "Rack1"));
    sim
}

/// Append `label` to the node's "fired" list.
fn mark(node: &mut NodeMut<'_>, label: &str) {
    let entry = node
        .store_mut()
        .entry("fired".to_string())
        .or_insert_with(|| StoreValue::List(Vec::new()));
    if let StoreValue::List(items) = entry {
        items.push(StoreValue::from(label));
    }
}

fn fired(sim: &Simulator, id: &str) -> Vec<String> {
    match sim.node(&NodeId::from(id)).and_then(|n| n.store().get("fired")) {
        Some(StoreValue::List(items)) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_events_run_in_time_order() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    {
        let mut node = sim.node_mut(&a).unwrap();
        node.set_timer("late", Duration::from_secs(2), |n| mark(n, "late"));
        node.set_timer("early", Duration::from_secs(1), |n| mark(n, "early"));
    }

    sim.step(Duration::from_secs(3));
    assert_eq!(fired(&sim, "A"), vec!["early", "late"]);
}

#[test]
fn test_equal_times_run_in_scheduling_order() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    {
        let mut node = sim.node_mut(&a).unwrap();
        for label in ["first", "second", "third"] {
            node.set_timer(label, Duration::from_millis(500), move |n| mark(n, label));
        }
    }

    sim.step(Duration::from_secs(1));
    assert_eq!(fired(&sim, "A"), vec!["first", "second", "third"]);
}

#[test]
fn test_event_on_step_boundary_runs_in_that_step() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    sim.node_mut(&a)
        .unwrap()
        .set_timer("edge", Duration::from_secs(1), |n| mark(n, "edge"));

    sim.step(Duration::from_millis(999));
    assert!(fired(&sim, "A").is_empty());
    sim.step(Duration::from_millis(1));
    assert_eq!(fired(&sim, "A"), vec!["edge"]);
}

#[test]
fn test_timer_callback_can_rearm() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    sim.node_mut(&a).unwrap().set_timer("tick", Duration::from_secs(1), |n| {
        mark(n, "tick");
        n.set_timer("tock", Duration::from_secs(1), |n| mark(n, "tock"));
    });

    sim.step(Duration::from_secs(1));
    assert_eq!(fired(&sim, "A"), vec!["tick"]);
    sim.step(Duration::from_secs(1));
    assert_eq!(fired(&sim, "A"), vec!["tick", "tock"]);
}

#[test]
fn test_cancelled_timer_never_fires() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    {
        let mut node = sim.node_mut(&a).unwrap();
        node.set_timer("t", Duration::from_secs(1), |n| mark(n, "t"));
        assert!(node.cancel_timer("t"));
        assert!(!node.cancel_timer("t"));
    }
    sim.step(Duration::from_secs(2));
    assert!(fired(&sim, "A").is_empty());
}

// ============================================================================
// Time stepping
// ============================================================================

#[test]
fn test_fractional_steps_do_not_drift() {
    let mut sim = two_node_sim();
    for _ in 0..10 {
        sim.step_secs(0.1);
    }
    assert_eq!(sim.now(), VirtualTime::from_secs(1));
}

#[test]
fn test_invalid_step_is_ignored() {
    let mut sim = two_node_sim();
    sim.step_secs(-1.0);
    sim.step_secs(f64::NAN);
    assert_eq!(sim.now(), VirtualTime::ZERO);
}

#[test]
fn test_negative_delay_is_not_scheduled() {
    let mut sim = two_node_sim();
    assert!(!sim.schedule_secs(-0.5, EventAction::HealPartition));
    assert!(sim.core().queue().is_empty());
    assert!(sim.schedule_secs(0.5, EventAction::HealPartition));
    assert_eq!(sim.core().queue().len(), 1);
}

#[test]
fn test_huge_delay_saturates_without_rewinding_clock() {
    let mut sim = two_node_sim();
    sim.step_secs(1.0);
    assert!(sim.schedule_secs(1e300, EventAction::HealPartition));

    sim.step_secs(10.0);
    assert_eq!(sim.now(), VirtualTime::from_secs(11));
    assert_eq!(sim.core().queue().len(), 1);

    // A heal scheduled past the end of time is clamped too
    sim.schedule_partition(
        Duration::from_secs(1),
        Duration::MAX,
        [NodeId::from("A")].into(),
        [NodeId::from("B")].into(),
    );
    sim.step_secs(2.0);
    assert_eq!(sim.now(), VirtualTime::from_secs(13));
    assert!(sim.network().are_partitioned(&NodeId::from("A"), &NodeId::from("B")));

    assert_eq!(sim.drain_events(10), 2);
    assert_eq!(sim.now(), VirtualTime::MAX);
}

#[test]
fn test_drain_events_ignores_time_bound() {
    let mut sim = two_node_sim();
    let a = NodeId::from("A");
    sim.node_mut(&a)
        .unwrap()
        .set_timer("far", Duration::from_secs(3600), |n| mark(n, "far"));

    assert_eq!(sim.drain_events(10), 1);
    assert_eq!(fired(&sim, "A"), vec!["far"]);
    assert_eq!(sim.now(), VirtualTime::from_secs(3600));
    assert_eq!(sim.drain_events(10), 0);
}

// ============================================================================
// Determinism
// ============================================================================

fn traffic_run(seed: u64) -> Simulator {
    let mut sim = datacenter_sim::Datacenter::default().build(SimulationConfig::chaos().with_seed(seed).shared());
    sim.set_active_algorithm("random_traffic");
    for step in 0..30 {
        sim.run_second(step);
    }
    sim
}

#[test]
fn test_same_seed_same_run() {
    let first = traffic_run(99);
    let second = traffic_run(99);

    let history_a: Vec<_> = first.message_history().cloned().collect();
    let history_b: Vec<_> = second.message_history().cloned().collect();
    assert!(!history_a.is_empty());
    assert_eq!(history_a, history_b);
    assert_eq!(first.global_stats(), second.global_stats());

    let cpu_a: Vec<f64> = first.nodes().map(|n| n.cpu_usage).collect();
    let cpu_b: Vec<f64> = second.nodes().map(|n| n.cpu_usage).collect();
    assert_eq!(cpu_a, cpu_b);
}
