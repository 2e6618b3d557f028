use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Global simulated time, in whole microseconds since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct VirtualTime(pub u64);

/// Non-negative span of simulated time, in whole microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Duration(pub u64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);
    pub const MAX: VirtualTime = VirtualTime(u64::MAX);

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0 / 1000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / MICROS_PER_SEC
    }

    pub fn from_millis(millis: u64) -> Self {
        VirtualTime(millis * 1000)
    }

    pub fn from_secs(secs: u64) -> Self {
        VirtualTime(secs * 1_000_000)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        VirtualTime(Duration::from_secs_f64(secs).0)
    }

    /// Time elapsed since `earlier`, saturating at zero.
    pub fn saturating_since(&self, earlier: VirtualTime) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

impl Add<Duration> for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: Duration) -> Self::Output {
        VirtualTime(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<Duration> for VirtualTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub<VirtualTime> for VirtualTime {
    type Output = Duration;

    fn sub(self, rhs: VirtualTime) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0);
    pub const MAX: Duration = Duration(u64::MAX);

    pub fn from_micros(micros: u64) -> Self {
        Duration(micros)
    }

    pub fn from_millis(millis: u64) -> Self {
        Duration(millis * 1000)
    }

    pub fn from_secs(secs: u64) -> Self {
        Duration(secs * 1_000_000)
    }

    /// Converts float seconds, rounding to the nearest microsecond.
    /// Negative and non-finite inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    /// Converts float seconds, rejecting negative and non-finite inputs.
    /// Spans too large for the range saturate at [`Duration::MAX`].
    pub fn try_from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        Some(Duration((secs * MICROS_PER_SEC).round() as u64))
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0 / 1000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / MICROS_PER_SEC
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Self::Output {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u64> for Duration {
    type Output = Duration;

    fn mul(self, rhs: u64) -> Self::Output {
        Duration(self.0.saturating_mul(rhs))
    }
}
