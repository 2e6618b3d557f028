use super::types::ThroughputStats;
use crate::simulator::{Duration, VirtualTime};

/// Message timestamps and sizes, summarized over a trailing window.
#[derive(Debug, Clone)]
pub struct ThroughputTracker {
    window: Duration,
    samples: Vec<(VirtualTime, usize)>,
}

impl Default for ThroughputTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ThroughputTracker {
    pub fn new(window: Duration) -> Self {
        ThroughputTracker {
            window,
            samples: Vec::new(),
        }
    }

    pub fn record_message(&mut self, timestamp: VirtualTime, size_bytes: usize) {
        self.samples.push((timestamp, size_bytes));
    }

    /// Rates over `[current_time - window, current_time]`.
    pub fn stats(&self, current_time: VirtualTime) -> ThroughputStats {
        let cutoff = VirtualTime(current_time.0.saturating_sub(self.window.0));
        let (count, bytes) = self
            .samples
            .iter()
            .filter(|(t, _)| *t >= cutoff && *t <= current_time)
            .fold((0usize, 0usize), |(c, b), (_, size)| (c + 1, b + size));

        let window = self.window.as_secs_f64();
        let (mps, bps) = if window > 0.0 {
            (count as f64 / window, bytes as f64 / window)
        } else {
            (0.0, 0.0)
        };

        ThroughputStats {
            total_messages: count,
            messages_per_second: mps,
            bytes_per_second: bps,
            time_window: window,
        }
    }

    pub fn total_recorded(&self) -> usize {
        self.samples.len()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
