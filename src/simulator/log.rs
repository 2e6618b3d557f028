use super::VirtualTime;
use std::collections::VecDeque;
use std::fmt;

/// Source name used for network-wide log entries
pub const NETWORK_SOURCE: &str = "NETWORK";

/// Category of a notable simulated event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Critical,
    Fault,
    Shutdown,
    Partition,
    PacketLoss,
    Reorder,
    Timeout,
    Ack,
    SyncViolation,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Critical => "CRITICAL",
            LogTag::Fault => "FAULT",
            LogTag::Shutdown => "SHUTDOWN",
            LogTag::Partition => "PARTITION",
            LogTag::PacketLoss => "PACKET_LOSS",
            LogTag::Reorder => "REORDER",
            LogTag::Timeout => "TIMEOUT",
            LogTag::Ack => "ACK",
            LogTag::SyncViolation => "SYNC_VIOLATION",
        }
    }

    fn is_warning(&self) -> bool {
        !matches!(self, LogTag::Reorder | LogTag::Ack)
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: VirtualTime,
    /// Node id, or [`NETWORK_SOURCE`]
    pub source: String,
    pub tag: Option<LogTag>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Some(tag) => write!(f, "[{}] {}: {} {}", self.time, self.source, tag, self.message),
            None => write!(f, "[{}] {}: {}", self.time, self.source, self.message),
        }
    }
}

/// Bounded ring of recent simulation log entries. Every entry is also
/// emitted through `tracing`.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        EventLog {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn record(&mut self, time: VirtualTime, source: &str, tag: Option<LogTag>, message: String) {
        let sim_time = time.as_secs_f64();
        match tag {
            Some(t) if t.is_warning() => {
                tracing::warn!(sim_time, source, tag = t.as_str(), "{}", message)
            }
            Some(t) => tracing::info!(sim_time, source, tag = t.as_str(), "{}", message),
            None => tracing::debug!(sim_time, source, "{}", message),
        }

        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            time,
            source: source.to_string(),
            tag,
            message,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn with_tag(&self, tag: LogTag) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.tag == Some(tag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
