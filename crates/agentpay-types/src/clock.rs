//! Time sources
//!
//! Lazy state transitions (agent expiry, period resets) read "now" from an
//! injected [`Clock`] so they stay deterministic under test.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentPayError, Result};

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Current time as unix seconds, clamped at zero
    fn unix_seconds(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// The process wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared handle to the system clock
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// `from + period`, or `InvalidInput` on `field` when the result is past
/// the range chrono can represent
pub fn checked_deadline(
    field: &str,
    from: DateTime<Utc>,
    period: Duration,
) -> Result<DateTime<Utc>> {
    from.checked_add_signed(period).ok_or_else(|| {
        AgentPayError::invalid_input(
            field,
            format!("{}s after {} is out of range", period.num_seconds(), from),
        )
    })
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the given unix timestamp
    pub fn at_unix(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    /// Move the clock forward (or backward, for negative deltas)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
