use datacenter_sim::benchmark::{load_scenarios, BenchmarkResults};
use datacenter_sim::{BenchmarkRunner, BenchmarkScenario, Datacenter, SimulationConfig};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCENARIO_DIR: &str = "benchmarks";
const DEFAULT_OUTPUT_DIR: &str = "benchmark_results";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let base_config = match std::env::var("DCSIM_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "loading simulation config");
            SimulationConfig::load(&path)?
        }
        Err(_) => SimulationConfig::default(),
    };

    let scenario_dir = std::env::var("BENCHMARK_DIR").unwrap_or_else(|_| DEFAULT_SCENARIO_DIR.to_string());
    let output_dir = std::env::var("BENCHMARK_OUTPUT").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string());

    let scenarios = collect_scenarios(Path::new(&scenario_dir));
    let mut runner = BenchmarkRunner::new(&output_dir)?;

    println!("=== Datacenter Network Benchmarks ===\n");

    let mut last_result = None;
    for scenario in &scenarios {
        let mut trial_seed = base_config.seed;
        let results = runner.run_scenario(
            scenario,
            || {
                let config = base_config.clone().with_seed(trial_seed);
                trial_seed = trial_seed.wrapping_add(1);
                Datacenter::new(scenario.nodes_per_rack.clone()).build(config.shared())
            },
            1,
        )?;

        for result in &results {
            print_summary(scenario, result);
        }
        last_result = results.into_iter().last().or(last_result);
    }

    let output = Path::new(&output_dir);
    runner.generate_report(output.join("benchmark_report.json"))?;
    if let Some(result) = last_result {
        std::fs::write(output.join("latest_metrics.json"), serde_json::to_string_pretty(&result.metrics)?)?;
    }

    println!("{}\n", runner.fault_stats().summary());
    println!("Results written to {}", output.display());
    Ok(())
}

/// Scenarios from `dir`, or a single default run when none parse.
fn collect_scenarios(dir: &Path) -> Vec<BenchmarkScenario> {
    let mut scenarios = Vec::new();
    match load_scenarios(dir) {
        Ok(entries) => {
            for (path, entry) in entries {
                match entry {
                    Ok(scenario) => scenarios.push(scenario),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping scenario"),
                }
            }
        }
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "no scenario directory"),
    }

    if scenarios.is_empty() {
        scenarios.push(
            BenchmarkScenario::new("default", "Random traffic on a quiet network", 30.0)
                .with_algorithm("random_traffic"),
        );
    }
    scenarios
}

fn print_summary(scenario: &BenchmarkScenario, result: &BenchmarkResults) {
    let m = &result.metrics;
    println!("--- {} ---", result.scenario_name);
    if !scenario.description.is_empty() {
        println!("  {}", scenario.description);
    }
    println!("  Simulated time:   {:.1}s", result.simulation_time);
    println!(
        "  Packets:          {} sent, {} received, {} dropped",
        m.packets_sent, m.packets_received, m.packets_dropped
    );
    println!("  Delivery rate:    {:.1}%", m.delivery_rate * 100.0);
    println!("  Latency avg/p99:  {:.3}s / {:.3}s", m.latency.avg, m.latency.p99);
    println!("  Throughput:       {:.2} msg/s", m.throughput.messages_per_second);
    println!(
        "  Sync:             {} violations, {} timeouts",
        m.sync_violations, m.sync_timeouts
    );
    println!();
}
