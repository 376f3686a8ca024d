//! Policy evaluation and composition
//!
//! Everything here is a pure function of its inputs plus the `now` it is
//! handed. State lives in [`Policy`] values; the [`crate::PolicyStore`] owns
//! the lock around them.

use agentpay_types::{Address, AgentPayError, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{Action, ContractAllowlist, FunctionAllowlist, Policy, Selector};

/// Whether `policy` lets an agent call `function_signature` on `contract`.
///
/// No policy denies everything. The contract and function allowlists are
/// independent gates; either can veto.
pub fn is_allowed(policy: Option<&Policy>, contract: &Address, function_signature: &str) -> bool {
    let Some(policy) = policy else {
        return false;
    };
    check_allowlists(policy, contract, function_signature).is_ok()
}

fn check_allowlists(policy: &Policy, contract: &Address, function_signature: &str) -> Result<()> {
    if let Some(allowlist) = &policy.contract_allowlist {
        if !allowlist.contains(contract) {
            return Err(AgentPayError::ContractNotAllowed {
                contract: *contract,
            });
        }
    }
    if let Some(allowlist) = &policy.function_allowlist {
        if !allowlist.selectors.contains(&Selector::of(function_signature)) {
            return Err(AgentPayError::FunctionNotAllowed {
                signature: function_signature.to_string(),
            });
        }
    }
    Ok(())
}

/// Merge policies under "most restrictive wins", skipping `None` entries.
///
/// - spending limits are concatenated, so each one still binds
/// - allowlists are unioned; an allowlist present in any input is present in
///   the result
/// - the time window takes the latest start and the earliest bounded end;
///   hours and days come from the first window seen
/// - the rate limit takes the smallest call count and the longest period
///
/// The result carries no id or creation time.
pub fn compose<'a, I, P>(policies: I) -> Policy
where
    I: IntoIterator<Item = P>,
    P: Into<Option<&'a Policy>>,
{
    let mut composed = Policy::default();

    for policy in policies
        .into_iter()
        .filter_map(|p| Into::<Option<&'a Policy>>::into(p))
    {
        composed
            .spending_limits
            .extend(policy.spending_limits.iter().cloned());

        if let Some(allowlist) = &policy.contract_allowlist {
            composed
                .contract_allowlist
                .get_or_insert_with(ContractAllowlist::default)
                .contracts
                .extend(allowlist.contracts.iter().copied());
        }

        if let Some(allowlist) = &policy.function_allowlist {
            composed
                .function_allowlist
                .get_or_insert_with(FunctionAllowlist::default)
                .selectors
                .extend(allowlist.selectors.iter().copied());
        }

        if let Some(window) = &policy.time_window {
            match composed.time_window.as_mut() {
                None => composed.time_window = Some(window.clone()),
                Some(merged) => {
                    if window.start > merged.start {
                        merged.start = window.start;
                    }
                    if let Some(end) = window.end {
                        if merged.end.map_or(true, |current| end < current) {
                            merged.end = Some(end);
                        }
                    }
                }
            }
        }

        if let Some(limit) = &policy.rate_limit {
            match composed.rate_limit.as_mut() {
                None => composed.rate_limit = Some(limit.clone()),
                Some(merged) => {
                    merged.max_calls = merged.max_calls.min(limit.max_calls);
                    merged.period = merged.period.max(limit.period);
                }
            }
        }
    }

    composed
}

/// Structural checks, reported in order: spending limits, time window,
/// rate limit. The first violation wins.
pub fn validate(policy: &Policy) -> Result<()> {
    for (i, limit) in policy.spending_limits.iter().enumerate() {
        if limit.max_amount.is_zero() {
            return Err(AgentPayError::invalid_policy(format!(
                "spending limit {} must have a positive max amount",
                i
            )));
        }
        if limit.period <= chrono::Duration::zero() {
            return Err(AgentPayError::invalid_policy(format!(
                "spending limit {} must have a positive period",
                i
            )));
        }
        if limit.reset_at.checked_add_signed(limit.period).is_none() {
            return Err(AgentPayError::invalid_policy(format!(
                "spending limit {} period is too long to schedule a reset",
                i
            )));
        }
    }

    if let Some(window) = &policy.time_window {
        if matches!(window.end, Some(end) if window.start > end) {
            return Err(AgentPayError::invalid_policy(
                "time window start is after its end",
            ));
        }
        if window.start_hour > 23 {
            return Err(AgentPayError::invalid_policy("start hour must be in 0..=23"));
        }
        if window.end_hour > 23 {
            return Err(AgentPayError::invalid_policy("end hour must be in 0..=23"));
        }
    }

    if let Some(limit) = &policy.rate_limit {
        if limit.max_calls == 0 {
            return Err(AgentPayError::invalid_policy(
                "rate limit max calls must be positive",
            ));
        }
        if limit.period <= chrono::Duration::zero() {
            return Err(AgentPayError::invalid_policy(
                "rate limit period must be positive",
            ));
        }
        if limit.reset_at.checked_add_signed(limit.period).is_none() {
            return Err(AgentPayError::invalid_policy(
                "rate limit period is too long to schedule a reset",
            ));
        }
    }

    Ok(())
}

/// Decide whether `action` is allowed right now without touching any counter.
///
/// Gates run in order: allowlists, time window, rate limit, then every
/// spending limit for the action's token.
pub fn evaluate(policy: &Policy, action: &Action, now: DateTime<Utc>) -> Result<()> {
    let mut scratch = policy.clone();
    run_gates(&mut scratch, action, now, false)
}

/// Evaluate `action` and, if every gate passes, count it against the rate
/// limit and the matching spending limits. On failure the policy is left as
/// it was.
pub fn authorize(policy: &mut Policy, action: &Action, now: DateTime<Utc>) -> Result<()> {
    let mut scratch = policy.clone();
    run_gates(&mut scratch, action, now, true)?;
    *policy = scratch;
    Ok(())
}

fn run_gates(policy: &mut Policy, action: &Action, now: DateTime<Utc>, commit: bool) -> Result<()> {
    let outcome = check_gates(policy, action, now, commit);
    if let Err(err) = &outcome {
        debug!(
            contract = %action.contract,
            function = %action.function_signature,
            amount = %action.amount,
            code = err.error_code(),
            "Policy denied action"
        );
    }
    outcome
}

fn check_gates(policy: &mut Policy, action: &Action, now: DateTime<Utc>, commit: bool) -> Result<()> {
    check_allowlists(policy, &action.contract, &action.function_signature)?;

    if let Some(window) = &policy.time_window {
        if !window.is_active(now) {
            return Err(AgentPayError::OutsideTimeWindow);
        }
    }

    if let Some(limit) = policy.rate_limit.as_mut() {
        if commit {
            limit.record(now)?;
        } else {
            limit.check(now)?;
        }
    }

    for limit in policy
        .spending_limits
        .iter_mut()
        .filter(|l| l.token == action.token)
    {
        if commit {
            limit.record(action.amount, now)?;
        } else {
            limit.check(action.amount, now)?;
        }
    }
    Ok(())
}
