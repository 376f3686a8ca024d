//! Budget tracking for automatic payments
//!
//! A [`BudgetTracker`] guards one agent's spend with a single mutex. Every
//! operation first renews the period if it has elapsed, then runs its checks
//! under the same lock, so `track` is atomic with respect to every other call.

use std::sync::Arc;

use agentpay_types::{
    system_clock, Address, AgentId, AgentPayError, Clock, Result, SharedClock, U256,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::types::{BudgetState, PaymentRecord, X402Policy};

/// Per-agent spend accounting against an [`X402Policy`]
#[derive(Debug)]
pub struct BudgetTracker {
    state: Mutex<BudgetState>,
    policy: X402Policy,
    clock: SharedClock,
}

impl BudgetTracker {
    /// `period` of zero means the period never renews
    pub fn new(policy: X402Policy, period: Duration, clock: SharedClock) -> Self {
        let state = BudgetState::new(clock.now(), period);
        Self {
            state: Mutex::new(state),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &X402Policy {
        &self.policy
    }

    /// Admission check with no side effect beyond a period renewal
    pub fn check(&self, amount: U256, payee: &Address) -> Result<()> {
        let mut state = self.state.lock();
        renew_period(&mut state, self.clock.now());
        admit(&self.policy, &state, amount, payee)
    }

    /// Check and account for a payment in one step
    pub fn track(&self, record: PaymentRecord) -> Result<()> {
        let mut state = self.state.lock();
        renew_period(&mut state, self.clock.now());
        admit(&self.policy, &state, record.amount, &record.pay_to)?;

        state.total_spent += record.amount;
        state.period_spent += record.amount;
        info!(
            resource = %record.resource,
            amount = %record.amount,
            pay_to = %record.pay_to,
            period_spent = %state.period_spent,
            "Payment tracked"
        );
        state.records.push(record);
        Ok(())
    }

    /// Budget left this period; `None` when no period ceiling is set
    pub fn remaining(&self) -> Option<U256> {
        let mut state = self.state.lock();
        renew_period(&mut state, self.clock.now());
        self.policy
            .max_per_period
            .map(|cap| cap.saturating_sub(state.period_spent))
    }

    pub fn is_exhausted(&self) -> bool {
        let mut state = self.state.lock();
        renew_period(&mut state, self.clock.now());
        matches!(self.policy.max_per_period, Some(cap) if state.period_spent >= cap)
    }

    /// Copy of the current accounting state
    pub fn snapshot(&self) -> BudgetState {
        let mut state = self.state.lock();
        renew_period(&mut state, self.clock.now());
        state.clone()
    }

    pub fn records(&self) -> Vec<PaymentRecord> {
        self.state.lock().records.clone()
    }
}

/// Renew on touch: once the period has elapsed, restart it at `now`.
/// A period whose end cannot be represented never elapses.
fn renew_period(state: &mut BudgetState, now: DateTime<Utc>) {
    if state.period_duration <= Duration::zero() {
        return;
    }
    let elapsed = state
        .period_start
        .checked_add_signed(state.period_duration)
        .map_or(false, |end| now >= end);
    if elapsed {
        debug!(previous_start = %state.period_start, "Budget period renewed");
        state.period_spent = U256::ZERO;
        state.period_start = now;
    }
}

fn admit(policy: &X402Policy, state: &BudgetState, amount: U256, payee: &Address) -> Result<()> {
    if !policy.payee_allowed(payee) {
        return Err(AgentPayError::PayeeNotAllowed { payee: *payee });
    }

    if let Some(limit) = policy.max_per_request {
        if amount > limit {
            return Err(AgentPayError::ExceedsPerRequestLimit {
                requested: amount,
                limit,
            });
        }
    }

    if let Some(cap) = policy.max_per_period {
        let remaining = cap.saturating_sub(state.period_spent);
        if amount > remaining {
            return Err(AgentPayError::ExceedsPeriodBudget {
                requested: amount,
                remaining,
            });
        }
    }

    Ok(())
}

/// One tracker per agent, created on first use with a shared default policy
#[derive(Debug)]
pub struct BudgetBook {
    trackers: DashMap<AgentId, Arc<BudgetTracker>>,
    default_policy: X402Policy,
    period: Duration,
    clock: SharedClock,
}

impl Default for BudgetBook {
    fn default() -> Self {
        Self::new(X402Policy::default(), Duration::zero(), system_clock())
    }
}

impl BudgetBook {
    pub fn new(default_policy: X402Policy, period: Duration, clock: SharedClock) -> Self {
        Self {
            trackers: DashMap::new(),
            default_policy,
            period,
            clock,
        }
    }

    /// The agent's tracker, creating it from the default policy if needed
    pub fn tracker(&self, agent_id: &AgentId) -> Arc<BudgetTracker> {
        self.trackers
            .entry(agent_id.clone())
            .or_insert_with(|| {
                Arc::new(BudgetTracker::new(
                    self.default_policy.clone(),
                    self.period,
                    self.clock.clone(),
                ))
            })
            .clone()
    }

    /// Install a tracker with an agent-specific policy, replacing any existing one
    pub fn set_policy(&self, agent_id: &AgentId, policy: X402Policy) -> Arc<BudgetTracker> {
        let tracker = Arc::new(BudgetTracker::new(policy, self.period, self.clock.clone()));
        self.trackers.insert(agent_id.clone(), tracker.clone());
        tracker
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<Arc<BudgetTracker>> {
        self.trackers.get(agent_id).map(|t| t.clone())
    }

    pub fn remove(&self, agent_id: &AgentId) -> Option<Arc<BudgetTracker>> {
        self.trackers.remove(agent_id).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentpay_types::ManualClock;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_unix(1_700_000_000))
    }

    fn payee() -> Address {
        Address::repeat_byte(0x22)
    }

    fn record(clock: &ManualClock, amount: u64) -> PaymentRecord {
        use agentpay_types::Clock;
        PaymentRecord::new("https://r.test/x", U256::from(amount), payee(), "base", clock.now())
    }

    fn capped(per_request: u64, per_period: u64) -> X402Policy {
        X402Policy {
            max_per_request: Some(U256::from(per_request)),
            max_per_period: Some(U256::from(per_period)),
            ..Default::default()
        }
    }

    #[test]
    fn fifth_payment_over_period_cap_is_rejected() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 200), Duration::hours(1), clock.clone());

        for _ in 0..4 {
            tracker.track(record(&clock, 50)).unwrap();
        }
        let err = tracker.track(record(&clock, 1)).unwrap_err();
        assert!(matches!(err, AgentPayError::ExceedsPeriodBudget { .. }));
        assert_eq!(tracker.remaining(), Some(U256::ZERO));
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.records().len(), 4);
    }

    #[test]
    fn per_request_limit() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 1000), Duration::hours(1), clock.clone());
        assert_eq!(
            tracker.check(U256::from(101), &payee()),
            Err(AgentPayError::ExceedsPerRequestLimit {
                requested: U256::from(101),
                limit: U256::from(100),
            })
        );
        tracker.check(U256::from(100), &payee()).unwrap();
    }

    #[test]
    fn check_does_not_spend() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 100), Duration::hours(1), clock.clone());
        tracker.check(U256::from(100), &payee()).unwrap();
        tracker.check(U256::from(100), &payee()).unwrap();
        assert_eq!(tracker.remaining(), Some(U256::from(100)));
    }

    #[test]
    fn payee_allowlist() {
        let clock = clock();
        let policy = X402Policy {
            allowed_payees: [payee()].into_iter().collect(),
            ..Default::default()
        };
        let tracker = BudgetTracker::new(policy, Duration::zero(), clock);
        tracker.check(U256::from(5), &payee()).unwrap();
        assert!(matches!(
            tracker.check(U256::from(5), &Address::repeat_byte(0x33)),
            Err(AgentPayError::PayeeNotAllowed { .. })
        ));
    }

    #[test]
    fn period_renews_on_touch() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 100), Duration::hours(1), clock.clone());
        tracker.track(record(&clock, 100)).unwrap();
        assert!(tracker.is_exhausted());

        // Several idle periods collapse into one renewal at the touch time.
        clock.advance(Duration::hours(5));
        assert_eq!(tracker.remaining(), Some(U256::from(100)));
        let state = tracker.snapshot();
        assert_eq!(state.period_start, clock_now(&clock));
        assert_eq!(state.total_spent, U256::from(100));
        assert_eq!(state.period_spent, U256::ZERO);
    }

    #[test]
    fn renewal_happens_exactly_at_boundary() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 100), Duration::hours(1), clock.clone());
        tracker.track(record(&clock, 100)).unwrap();
        clock.advance(Duration::hours(1));
        assert!(!tracker.is_exhausted());
    }

    #[test]
    fn zero_period_never_renews() {
        let clock = clock();
        let tracker = BudgetTracker::new(capped(100, 100), Duration::zero(), clock.clone());
        tracker.track(record(&clock, 100)).unwrap();
        clock.advance(Duration::days(365));
        assert!(tracker.is_exhausted());
    }

    #[test]
    fn period_past_calendar_range_never_renews() {
        let clock = clock();
        let period = Duration::days(365 * 300_000);
        let tracker = BudgetTracker::new(capped(100, 100), period, clock.clone());
        tracker.track(record(&clock, 100)).unwrap();

        clock.advance(Duration::days(365 * 1_000));
        assert!(tracker.is_exhausted());
        assert!(tracker.check(U256::from(1), &payee()).is_err());
    }

    #[test]
    fn unbounded_period_has_no_remaining() {
        let tracker = BudgetTracker::new(X402Policy::default(), Duration::hours(1), clock());
        assert_eq!(tracker.remaining(), None);
        assert!(!tracker.is_exhausted());
    }

    #[test]
    fn book_hands_out_one_tracker_per_agent() {
        let clock = clock();
        let book = BudgetBook::new(capped(10, 10), Duration::hours(1), clock.clone());
        let a = AgentId::from("aa");

        let first = book.tracker(&a);
        first.track(record(&clock, 10)).unwrap();
        assert!(book.tracker(&a).is_exhausted());
        assert!(!book.tracker(&AgentId::from("bb")).is_exhausted());
        assert_eq!(book.len(), 2);

        let replaced = book.set_policy(&a, capped(10, 20));
        assert!(!replaced.is_exhausted());
        assert!(book.remove(&a).is_some());
        assert!(book.get(&a).is_none());
    }

    fn clock_now(clock: &ManualClock) -> DateTime<Utc> {
        use agentpay_types::Clock;
        clock.now()
    }
}
