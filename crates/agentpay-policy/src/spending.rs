//! Per-token spending limits with lazy period reset

use agentpay_types::{
    checked_deadline, decimal_u256, duration_secs, Address, AgentPayError, Result, U256,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ceiling on how much of one token may be spent per period.
///
/// The period rolls over lazily: the first `check` or `record` after
/// `reset_at` zeroes `spent` and schedules the next reset one period from
/// that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimit {
    pub token: Address,
    /// Ceiling per period, in the token's smallest unit
    #[serde(with = "decimal_u256")]
    pub max_amount: U256,
    /// Spent so far this period
    #[serde(with = "decimal_u256", default = "zero")]
    pub spent: U256,
    /// Period length, as whole seconds on the wire
    #[serde(with = "duration_secs")]
    pub period: Duration,
    /// Defaults to the epoch, so a fresh document resets on first use
    #[serde(default)]
    pub reset_at: DateTime<Utc>,
}

fn zero() -> U256 {
    U256::ZERO
}

impl SpendingLimit {
    /// A period too long to represent pins `reset_at` to the end of time
    pub fn new(token: Address, max_amount: U256, period: Duration, now: DateTime<Utc>) -> Self {
        Self {
            token,
            max_amount,
            spent: U256::ZERO,
            period,
            reset_at: now.checked_add_signed(period).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn roll_over(&mut self, now: DateTime<Utc>) -> Result<()> {
        if now > self.reset_at {
            self.reset_at = checked_deadline("period", now, self.period)?;
            self.spent = U256::ZERO;
        }
        Ok(())
    }

    /// Check that `amount` fits in what is left of the current period
    pub fn check(&mut self, amount: U256, now: DateTime<Utc>) -> Result<()> {
        if amount.is_zero() {
            return Err(AgentPayError::invalid_input("amount", "amount must be positive"));
        }
        self.roll_over(now)?;

        let remaining = self.max_amount.saturating_sub(self.spent);
        if amount > remaining {
            return Err(AgentPayError::ExceedsLimit {
                token: self.token,
                requested: amount,
                remaining,
            });
        }
        Ok(())
    }

    /// Check, then count `amount` against the period. Nothing changes on failure.
    pub fn record(&mut self, amount: U256, now: DateTime<Utc>) -> Result<()> {
        self.check(amount, now)?;
        self.spent += amount;
        Ok(())
    }

    /// What can still be spent this period, as of `now`
    pub fn remaining(&self, now: DateTime<Utc>) -> U256 {
        if now > self.reset_at {
            return self.max_amount;
        }
        self.max_amount.saturating_sub(self.spent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn limit() -> SpendingLimit {
        let mut limit = SpendingLimit::new(
            Address::repeat_byte(0xaa),
            U256::from(1000),
            Duration::hours(24),
            t0(),
        );
        limit.spent = U256::from(500);
        limit
    }

    #[test]
    fn rejects_amount_over_remaining() {
        let mut l = limit();
        let err = l.check(U256::from(501), t0()).unwrap_err();
        assert_eq!(
            err,
            AgentPayError::ExceedsLimit {
                token: Address::repeat_byte(0xaa),
                requested: U256::from(501),
                remaining: U256::from(500),
            }
        );
    }

    #[test]
    fn exact_remaining_is_allowed() {
        let mut l = limit();
        l.record(U256::from(500), t0()).unwrap();
        assert_eq!(l.spent, U256::from(1000));
        assert!(l.check(U256::from(1), t0()).is_err());
    }

    #[test]
    fn zero_amount_is_invalid() {
        let mut l = limit();
        assert_eq!(
            l.check(U256::ZERO, t0()).unwrap_err().error_code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn resets_after_period() {
        let mut l = limit();
        let later = t0() + Duration::hours(24) + Duration::seconds(1);

        l.check(U256::from(1000), later).unwrap();
        assert_eq!(l.spent, U256::ZERO);
        assert_eq!(l.reset_at, later + Duration::hours(24));
    }

    #[test]
    fn no_reset_exactly_at_boundary() {
        let mut l = limit();
        let boundary = t0() + Duration::hours(24);
        assert!(l.check(U256::from(501), boundary).is_err());
    }

    #[test]
    fn unrepresentable_reset_is_an_error() {
        let mut l = limit();
        l.period = Duration::days(365 * 300_000);
        let later = t0() + Duration::hours(25);

        let before = l.clone();
        let err = l.record(U256::from(1), later).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(l, before);
    }

    #[test]
    fn huge_period_never_resets() {
        let l = SpendingLimit::new(
            Address::repeat_byte(0xaa),
            U256::from(1),
            Duration::days(365 * 300_000),
            t0(),
        );
        assert_eq!(l.reset_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn failed_record_changes_nothing() {
        let mut l = limit();
        let before = l.clone();
        assert!(l.record(U256::from(600), t0()).is_err());
        assert_eq!(l, before);
    }
}
