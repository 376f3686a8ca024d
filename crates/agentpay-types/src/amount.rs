//! Token amounts
//!
//! Amounts are unsigned 256-bit integers in the token's smallest unit. Wire
//! formats carry them as decimal strings, so this module owns the parsing and
//! the serde adapters that keep that representation.

use crate::{AgentPayError, Result};
use alloy_primitives::U256;

/// Parse a base-10 amount string. Signs, whitespace, separators and `0x`
/// prefixes are rejected.
pub fn parse_amount(field: &str, raw: &str) -> Result<U256> {
    if raw.is_empty() {
        return Err(AgentPayError::invalid_input(field, "empty amount"));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AgentPayError::invalid_input(
            field,
            format!("'{}' is not a decimal integer", raw),
        ));
    }
    U256::from_str_radix(raw, 10)
        .map_err(|e| AgentPayError::invalid_input(field, format!("'{}': {}", raw, e)))
}

/// Reject zero amounts
pub fn require_positive(field: &str, amount: U256) -> Result<U256> {
    if amount.is_zero() {
        return Err(AgentPayError::invalid_input(field, "amount must be positive"));
    }
    Ok(amount)
}

/// Serde adapter: `U256` as a decimal string
pub mod decimal_u256 {
    use alloy_primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_amount("amount", &raw).map_err(D::Error::custom)
    }
}

/// Serde adapter: `Option<U256>` as an optional decimal string
pub mod option_decimal_u256 {
    use alloy_primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| super::parse_amount("amount", &s).map_err(D::Error::custom))
            .transpose()
    }
}

/// Serde adapter: `chrono::Duration` as whole seconds
pub mod duration_secs {
    use chrono::Duration;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("duration of {}s is out of range", secs)))
    }
}
