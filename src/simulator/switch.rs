use super::Duration;
use serde::{Deserialize, Serialize};

/// Utilization (percent) above which a switch is congested
const CONGESTION_SET: f64 = 80.0;
/// Utilization (percent) below which congestion clears
const CONGESTION_CLEAR: f64 = 60.0;
/// Utilization decay per metrics tick, in percentage points
const UTILIZATION_DECAY: f64 = 5.0;

/// Role of a switch in the leaf-spine fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchKind {
    /// Top-of-rack switch
    Leaf,
    /// Aggregation switch connecting all leaves
    Spine,
}

impl SwitchKind {
    fn default_latency(&self) -> Duration {
        match self {
            SwitchKind::Leaf => Duration::from_millis(1),
            SwitchKind::Spine => Duration::from_millis(2),
        }
    }
}

/// A leaf or spine network device.
#[derive(Debug, Clone)]
pub struct Switch {
    pub id: String,
    pub kind: SwitchKind,
    /// Rack served by a leaf switch
    pub rack_id: Option<String>,
    pub port_count: u32,
    pub bandwidth_gbps: u32,
    pub active_connections: u32,
    pub packets_forwarded: u64,
    /// Percent of ports in use, 0-100
    pub port_utilization: f64,
    pub is_congested: bool,
    pub switching_latency: Duration,
}

impl Switch {
    pub fn new(id: impl Into<String>, kind: SwitchKind, rack_id: Option<String>, port_count: u32, bandwidth_gbps: u32) -> Self {
        Switch {
            id: id.into(),
            kind,
            rack_id,
            port_count,
            bandwidth_gbps,
            active_connections: 0,
            packets_forwarded: 0,
            port_utilization: 0.0,
            is_congested: false,
            switching_latency: kind.default_latency(),
        }
    }

    /// 48-port, 10 Gbps top-of-rack switch
    pub fn leaf(id: impl Into<String>, rack_id: impl Into<String>) -> Self {
        Self::new(id, SwitchKind::Leaf, Some(rack_id.into()), 48, 10)
    }

    /// 96-port, 100 Gbps spine switch
    pub fn spine(id: impl Into<String>) -> Self {
        Self::new(id, SwitchKind::Spine, None, 96, 100)
    }

    pub fn is_leaf_for(&self, rack_id: &str) -> bool {
        self.kind == SwitchKind::Leaf && self.rack_id.as_deref() == Some(rack_id)
    }

    /// Forward one packet and return this hop's delay. A switch above 80%
    /// utilization forwards at twice its base latency.
    pub fn forward_packet(&mut self) -> Duration {
        self.packets_forwarded += 1;
        self.port_utilization = self.connection_ratio();
        self.apply_hysteresis();

        if self.port_utilization > CONGESTION_SET {
            self.switching_latency * 2
        } else {
            self.switching_latency
        }
    }

    /// Per-second decay of utilization.
    pub fn update_metrics(&mut self) {
        self.port_utilization = (self.port_utilization - UTILIZATION_DECAY).max(0.0);
        self.apply_hysteresis();
    }

    pub fn set_active_connections(&mut self, connections: u32) {
        self.active_connections = connections;
    }

    /// Set utilization directly (e.g. to replay a load trace).
    pub fn set_utilization(&mut self, percent: f64) {
        self.port_utilization = percent.clamp(0.0, 100.0);
        self.apply_hysteresis();
    }

    /// Zero traffic counters, keeping attachments.
    pub fn reset_counters(&mut self) {
        self.packets_forwarded = 0;
        self.port_utilization = 0.0;
        self.is_congested = false;
    }

    fn connection_ratio(&self) -> f64 {
        if self.port_count == 0 {
            return 100.0;
        }
        (self.active_connections as f64 / self.port_count as f64 * 100.0).min(100.0)
    }

    fn apply_hysteresis(&mut self) {
        if self.port_utilization > CONGESTION_SET {
            self.is_congested = true;
        } else if self.port_utilization < CONGESTION_CLEAR {
            self.is_congested = false;
        }
    }
}
