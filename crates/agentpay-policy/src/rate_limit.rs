//! Call-rate limits

use agentpay_types::{checked_deadline, duration_secs, AgentPayError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// At most `max_calls` authorized actions per period, reset lazily like
/// [`crate::SpendingLimit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_calls: u64,
    /// Calls authorized so far this period
    #[serde(default)]
    pub calls: u64,
    #[serde(with = "duration_secs")]
    pub period: Duration,
    /// Defaults to the epoch, like [`crate::SpendingLimit::reset_at`]
    #[serde(default)]
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    pub fn new(max_calls: u64, period: Duration, now: DateTime<Utc>) -> Self {
        Self {
            max_calls,
            calls: 0,
            period,
            reset_at: now.checked_add_signed(period).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn roll_over(&mut self, now: DateTime<Utc>) -> Result<()> {
        if now > self.reset_at {
            self.reset_at = checked_deadline("period", now, self.period)?;
            self.calls = 0;
        }
        Ok(())
    }

    pub fn check(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.roll_over(now)?;
        if self.calls >= self.max_calls {
            return Err(AgentPayError::RateLimitExceeded {
                max_calls: self.max_calls,
                period_secs: self.period.num_seconds(),
            });
        }
        Ok(())
    }

    pub fn record(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.check(now)?;
        self.calls += 1;
        Ok(())
    }
}
