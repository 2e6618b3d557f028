use super::results::{BenchmarkResults, Comparison, MetricSummary, Report};
use super::scenario::BenchmarkScenario;
use super::BenchmarkError;
use crate::faults::FaultStats;
use crate::metrics::MetricsSnapshot;
use crate::simulator::{Duration, Simulator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metrics compared by [`BenchmarkRunner::compare_results`]. Nested stats
/// contribute one representative value.
fn compared_metrics(m: &MetricsSnapshot) -> [(&'static str, f64); 5] {
    [
        ("latency", m.latency.avg),
        ("throughput", m.throughput.messages_per_second),
        ("delivery_rate", m.delivery_rate),
        ("sync_violations", m.sync_violations as f64),
        ("sync_timeouts", m.sync_timeouts as f64),
    ]
}

/// Scenario time in seconds; `+inf` means never. Negative and NaN are invalid.
fn span_from_secs(secs: f64) -> Option<Duration> {
    if secs == f64::INFINITY {
        return Some(Duration::MAX);
    }
    Duration::try_from_secs_f64(secs)
}

/// Runs scenarios against fresh simulators and persists each trial.
#[derive(Debug)]
pub struct BenchmarkRunner {
    output_dir: PathBuf,
    results: Vec<BenchmarkResults>,
    /// Fault-point counts merged over every trial run so far
    fault_stats: FaultStats,
}

impl BenchmarkRunner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, BenchmarkError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(BenchmarkRunner {
            output_dir,
            results: Vec::new(),
            fault_stats: FaultStats::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn results(&self) -> &[BenchmarkResults] {
        &self.results
    }

    pub fn fault_stats(&self) -> &FaultStats {
        &self.fault_stats
    }

    /// Run `trials` independent trials of `scenario`, each on a simulator
    /// from `factory`, saving one result file per trial.
    pub fn run_scenario<F>(
        &mut self,
        scenario: &BenchmarkScenario,
        mut factory: F,
        trials: u32,
    ) -> Result<Vec<BenchmarkResults>, BenchmarkError>
    where
        F: FnMut() -> Simulator,
    {
        let mut trial_results = Vec::with_capacity(trials as usize);

        for trial in 1..=trials {
            tracing::info!(scenario = %scenario.name, trial, trials, "running benchmark trial");

            let mut sim = factory();
            Self::configure(&mut sim, scenario);
            Self::run(&mut sim, scenario);
            let result = Self::collect(&sim, scenario, trial);
            self.fault_stats.merge(sim.fault_stats());

            let filename = format!(
                "{}_trial{}_{}.json",
                scenario.name,
                trial,
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            result.save(self.output_dir.join(filename))?;

            tracing::info!(
                scenario = %result.scenario_name,
                sent = result.metrics.packets_sent,
                received = result.metrics.packets_received,
                dropped = result.metrics.packets_dropped,
                "trial complete"
            );
            trial_results.push(result.clone());
            self.results.push(result);
        }

        Ok(trial_results)
    }

    /// Apply scenario parameters: live config, base latency, algorithm,
    /// then the partition schedule.
    pub fn configure(sim: &mut Simulator, scenario: &BenchmarkScenario) {
        {
            let mut config = sim.config().write();
            scenario.apply_to_config(&mut config);
        }
        sim.network_mut().set_latency(Duration::from_secs_f64(scenario.latency));

        if let Some(name) = &scenario.algorithm_name {
            sim.set_active_algorithm(name);
        }

        for event in &scenario.partition_schedule {
            let (Some(at), Some(duration)) = (
                span_from_secs(event.time),
                span_from_secs(event.duration),
            ) else {
                tracing::debug!(
                    scenario = %scenario.name,
                    time = event.time,
                    duration = event.duration,
                    "skipping partition with invalid timing"
                );
                continue;
            };
            let (group_a, group_b) = event.groups();
            sim.schedule_partition(at, duration, group_a, group_b);
        }
    }

    fn run(sim: &mut Simulator, scenario: &BenchmarkScenario) {
        for step in 0..scenario.steps() {
            sim.run_second(step);
        }
    }

    fn collect(sim: &Simulator, scenario: &BenchmarkScenario, trial: u32) -> BenchmarkResults {
        BenchmarkResults {
            scenario_name: format!("{}_trial{}", scenario.name, trial),
            timestamp: chrono::Local::now().to_rfc3339(),
            simulation_time: sim.now().as_secs_f64(),
            metrics: sim.global_stats(),
            node_metrics: sim.node_stats(),
        }
    }

    /// Summarize key metrics over the collected results named in `names`.
    pub fn compare_results(&self, names: &[&str]) -> Comparison {
        let matching: Vec<&BenchmarkResults> = self
            .results
            .iter()
            .filter(|r| names.contains(&r.scenario_name.as_str()))
            .collect();

        let mut columns: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
        for result in &matching {
            for (key, value) in compared_metrics(&result.metrics) {
                columns.entry(key).or_default().push(value);
            }
        }

        let metrics = columns
            .into_iter()
            .filter_map(|(key, values)| MetricSummary::from_values(values).map(|s| (key.to_string(), s)))
            .collect();

        Comparison {
            scenarios: names.iter().map(|n| n.to_string()).collect(),
            metrics,
        }
    }

    pub fn report(&self) -> Report {
        Report {
            generated_at: chrono::Local::now().to_rfc3339(),
            total_scenarios: self.results.len(),
            results: self.results.clone(),
        }
    }

    pub fn generate_report(&self, path: impl AsRef<Path>) -> Result<(), BenchmarkError> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(&self.report())?)?;
        tracing::info!(path = %path.display(), "benchmark report written");
        Ok(())
    }
}
