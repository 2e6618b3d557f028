//! Statistical summaries produced by the metrics collector

use serde::{Deserialize, Serialize};

/// Summary of a latency sample set, in seconds.
///
/// Percentiles use the nearest-rank index `floor(count × q)` over the sorted
/// samples, so small sets lean high.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyStats {
    /// Summarize raw samples. An empty set yields all zeros.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        LatencyStats {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            avg: sum / count as f64,
            median,
            p50: sorted[percentile_index(count, 0.50)],
            p95: sorted[percentile_index(count, 0.95)],
            p99: sorted[percentile_index(count, 0.99)],
        }
    }
}

fn percentile_index(count: usize, quantile: f64) -> usize {
    ((count as f64 * quantile).floor() as usize).min(count - 1)
}

/// Message rate over a trailing window ending at the query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    pub total_messages: usize,
    pub messages_per_second: f64,
    pub bytes_per_second: f64,
    /// Window length in seconds
    pub time_window: f64,
}

impl Default for ThroughputStats {
    fn default() -> Self {
        ThroughputStats {
            total_messages: 0,
            messages_per_second: 0.0,
            bytes_per_second: 0.0,
            time_window: 1.0,
        }
    }
}

/// Point-in-time view of all global metrics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub latency: LatencyStats,
    pub throughput: ThroughputStats,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    /// received / sent, 0 when nothing was sent
    pub delivery_rate: f64,
    pub sync_violations: u64,
    pub sync_timeouts: u64,
    pub node_failures: u64,
    pub partition_events: u64,
}

impl MetricsSnapshot {
    /// Flatten to `(name, value)` rows, nested stats prefixed by their group.
    pub fn flatten(&self) -> Vec<(String, f64)> {
        let l = &self.latency;
        let t = &self.throughput;
        vec![
            ("latency_count".into(), l.count as f64),
            ("latency_min".into(), l.min),
            ("latency_max".into(), l.max),
            ("latency_avg".into(), l.avg),
            ("latency_median".into(), l.median),
            ("latency_p50".into(), l.p50),
            ("latency_p95".into(), l.p95),
            ("latency_p99".into(), l.p99),
            ("throughput_total_messages".into(), t.total_messages as f64),
            ("throughput_messages_per_second".into(), t.messages_per_second),
            ("throughput_bytes_per_second".into(), t.bytes_per_second),
            ("throughput_time_window".into(), t.time_window),
            ("packets_sent".into(), self.packets_sent as f64),
            ("packets_received".into(), self.packets_received as f64),
            ("packets_dropped".into(), self.packets_dropped as f64),
            ("delivery_rate".into(), self.delivery_rate),
            ("sync_violations".into(), self.sync_violations as f64),
            ("sync_timeouts".into(), self.sync_timeouts as f64),
            ("node_failures".into(), self.node_failures as f64),
            ("partition_events".into(), self.partition_events as f64),
        ]
    }

    /// Render as a two-column `Metric,Value` CSV table.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Metric,Value\n");
        for (name, value) in self.flatten() {
            out.push_str(&format!("{},{}\n", name, value));
        }
        out
    }
}

/// Per-node view: latency and throughput of the node's own sends, plus its
/// packet counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeStats {
    pub latency: LatencyStats,
    pub throughput: ThroughputStats,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_sample_summary() {
        let stats = LatencyStats::from_samples(&[3.0, 1.0, 5.0, 2.0, 4.0]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.avg, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.p50, 3.0);
        // floor(5 × 0.95) = 4
        assert_eq!(stats.p95, 5.0);
        assert_eq!(stats.p99, 5.0);
    }

    #[test]
    fn test_even_count_median_averages_middle() {
        let stats = LatencyStats::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.p50, 3.0);
    }

    #[test]
    fn test_single_sample() {
        let stats = LatencyStats::from_samples(&[0.25]);
        assert_eq!(stats.p95, 0.25);
        assert_eq!(stats.p99, 0.25);
        assert_eq!(stats.median, 0.25);
    }

    #[test]
    fn test_empty_is_zeroed() {
        let stats = LatencyStats::from_samples(&[]);
        assert_eq!(stats, LatencyStats::default());
        assert!(serde_json::to_string(&stats).is_ok());
    }

    #[test]
    fn test_p99_on_hundred_samples() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let stats = LatencyStats::from_samples(&samples);
        assert_eq!(stats.p95, 96.0);
        assert_eq!(stats.p99, 100.0);
    }

    #[test]
    fn test_csv_layout() {
        let snapshot = MetricsSnapshot {
            packets_sent: 4,
            packets_received: 3,
            delivery_rate: 0.75,
            ..Default::default()
        };
        let csv = snapshot.to_csv();
        assert!(csv.starts_with("Metric,Value\n"));
        assert!(csv.contains("packets_sent,4\n"));
        assert!(csv.contains("delivery_rate,0.75\n"));
    }
}
