//! Hot path benchmarks for the simulation core.
//!
//! Run with: `cargo bench --bench hot_paths`
//! Compare baselines: `cargo bench --bench hot_paths -- --baseline main`
//!
//! Covers the event queue, the network send path and one full simulated
//! second over the default datacenter.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use datacenter_sim::simulator::{EventAction, EventQueue, VirtualTime};
use datacenter_sim::{Datacenter, NodeId, SimulationConfig};

/// Benchmark EventQueue push followed by draining everything due
fn bench_event_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_queue");

    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_function(format!("push_pop_{}", size), |b| {
            b.iter(|| {
                let mut queue = EventQueue::new();
                for i in 0..size {
                    // Interleave times so the heap actually reorders
                    let time = VirtualTime((i * 7919) % size);
                    queue.push(time, 1, EventAction::HealPartition);
                }
                let mut popped = 0;
                while queue.pop_due(VirtualTime(size)).is_some() {
                    popped += 1;
                }
                black_box(popped)
            })
        });
    }

    group.finish();
}

/// Benchmark Network::send through a node handle, flat and leaf-spine routed
fn bench_network_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_send");
    group.throughput(Throughput::Elements(100));

    let src = NodeId::from("R1-S1");
    for (name, dst) in [("same_rack", NodeId::from("R1-S2")), ("cross_rack", NodeId::from("R2-S1"))] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || Datacenter::default().build(SimulationConfig::calm().shared()),
                |mut sim| {
                    if let Some(mut node) = sim.node_mut(&src) {
                        for _ in 0..100 {
                            black_box(node.send(&dst, "PING"));
                        }
                    }
                    sim
                },
                BatchSize::SmallInput,
            )
        });
    }

    // Lossy, jittery network exercises every random branch
    group.bench_function("chaos", |b| {
        b.iter_batched(
            || Datacenter::default().build(SimulationConfig::chaos().shared()),
            |mut sim| {
                if let Some(mut node) = sim.node_mut(&src) {
                    for _ in 0..100 {
                        black_box(node.send(&NodeId::from("R2-S4"), "PING"));
                    }
                }
                sim
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

/// Benchmark one simulated second with random traffic active
fn bench_run_second(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_second");
    group.throughput(Throughput::Elements(1));

    group.bench_function("default_datacenter", |b| {
        b.iter_batched(
            || {
                let mut sim = Datacenter::default().build(SimulationConfig::calm().shared());
                sim.set_active_algorithm("random_traffic");
                sim
            },
            |mut sim| {
                for step in 0..10 {
                    sim.run_second(step);
                }
                sim
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_event_queue, bench_network_send, bench_run_second);

criterion_main!(benches);
