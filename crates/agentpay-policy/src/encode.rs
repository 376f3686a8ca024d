//! On-chain policy encoding
//!
//! Flattens a [`Policy`] into the argument tuple the policy contract accepts:
//! `(address[] tokens, uint256[] amounts, address[] contracts,
//! bytes4[] selectors, uint256 validAfter, uint256 validUntil,
//! uint256 rateMaxCalls, uint256 ratePeriod)`.

use agentpay_crypto::{encode_params, AbiType, AbiValue};
use agentpay_types::{Result, U256};

use crate::model::Policy;

fn policy_types() -> Vec<AbiType> {
    let address_list = AbiType::Array(Box::new(AbiType::Address));
    vec![
        address_list.clone(),
        AbiType::Array(Box::new(AbiType::Uint(256))),
        address_list,
        AbiType::Array(Box::new(AbiType::FixedBytes(4))),
        AbiType::Uint(256),
        AbiType::Uint(256),
        AbiType::Uint(256),
        AbiType::Uint(256),
    ]
}

fn unix(ts: chrono::DateTime<chrono::Utc>) -> U256 {
    U256::from(ts.timestamp().max(0) as u64)
}

/// ABI-encode a policy. Absent parts encode as empty lists or zero; an
/// unbounded time window encodes `validUntil = 0`.
pub fn encode_policy(policy: &Policy) -> Result<Vec<u8>> {
    let tokens = policy
        .spending_limits
        .iter()
        .map(|l| AbiValue::Address(l.token))
        .collect();
    let amounts = policy
        .spending_limits
        .iter()
        .map(|l| AbiValue::Uint(l.max_amount))
        .collect();
    let contracts = policy
        .contract_allowlist
        .iter()
        .flat_map(|a| a.contracts.iter())
        .map(|c| AbiValue::Address(*c))
        .collect();
    let selectors = policy
        .function_allowlist
        .iter()
        .flat_map(|a| a.selectors.iter())
        .map(|s| AbiValue::FixedBytes(s.as_bytes().to_vec()))
        .collect();

    let (valid_after, valid_until) = match &policy.time_window {
        Some(window) => (unix(window.start), window.end.map(unix).unwrap_or(U256::ZERO)),
        None => (U256::ZERO, U256::ZERO),
    };
    let (rate_max_calls, rate_period) = match &policy.rate_limit {
        Some(limit) => (
            U256::from(limit.max_calls),
            U256::from(limit.period.num_seconds().max(0) as u64),
        ),
        None => (U256::ZERO, U256::ZERO),
    };

    encode_params(
        &policy_types(),
        &[
            AbiValue::Array(tokens),
            AbiValue::Array(amounts),
            AbiValue::Array(contracts),
            AbiValue::Array(selectors),
            AbiValue::Uint(valid_after),
            AbiValue::Uint(valid_until),
            AbiValue::Uint(rate_max_calls),
            AbiValue::Uint(rate_period),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RateLimit, SpendingLimit, TimeWindow};
    use agentpay_types::Address;
    use chrono::{DateTime, Duration};

    fn word(data: &[u8], index: usize) -> U256 {
        U256::from_be_slice(&data[index * 32..(index + 1) * 32])
    }

    #[test]
    fn empty_policy_layout() {
        let data = encode_policy(&Policy::new()).unwrap();
        // 8 head words + 4 empty array length words
        assert_eq!(data.len(), 12 * 32);
        assert_eq!(word(&data, 0), U256::from(8 * 32));
        assert_eq!(word(&data, 8), U256::ZERO);
    }

    #[test]
    fn encodes_limits_and_window() {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = Address::repeat_byte(0x11);
        let policy = Policy::new()
            .with_spending_limit(SpendingLimit::new(token, U256::from(5000), Duration::hours(1), t0))
            .with_functions(["transfer(address,uint256)"])
            .with_time_window(TimeWindow::starting(t0))
            .with_rate_limit(RateLimit::new(7, Duration::minutes(10), t0));

        let data = encode_policy(&policy).unwrap();
        assert_eq!(word(&data, 4), U256::from(1_700_000_000u64));
        assert_eq!(word(&data, 5), U256::ZERO);
        assert_eq!(word(&data, 6), U256::from(7));
        assert_eq!(word(&data, 7), U256::from(600));

        // tokens array: length 1, then the address word
        let tokens_at = word(&data, 0).to::<usize>() / 32;
        assert_eq!(word(&data, tokens_at), U256::from(1));
        assert_eq!(&data[(tokens_at + 1) * 32 + 12..(tokens_at + 2) * 32], token.as_slice());

        // selectors array holds a9059cbb left-aligned
        let selectors_at = word(&data, 3).to::<usize>() / 32;
        assert_eq!(word(&data, selectors_at), U256::from(1));
        let sel_word = &data[(selectors_at + 1) * 32..(selectors_at + 2) * 32];
        assert_eq!(&sel_word[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }
}
