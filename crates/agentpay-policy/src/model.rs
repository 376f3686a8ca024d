//! Policy data model

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use agentpay_crypto::function_selector;
use agentpay_types::{Address, AgentPayError, PolicyId, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::rate_limit::RateLimit;
use crate::spending::SpendingLimit;
use crate::time_window::TimeWindow;

/// A 4-byte function selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Selector of a canonical signature such as `transfer(address,uint256)`
    pub fn of(signature: &str) -> Self {
        Self(function_selector(signature))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = AgentPayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| AgentPayError::invalid_input("selector", format!("'{}': {}", s, e)))?;
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| {
            AgentPayError::invalid_input("selector", format!("'{}' is not 4 bytes", s))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Contracts an agent may call. Present but empty allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAllowlist {
    pub contracts: BTreeSet<Address>,
}

impl ContractAllowlist {
    pub fn new(contracts: impl IntoIterator<Item = Address>) -> Self {
        Self {
            contracts: contracts.into_iter().collect(),
        }
    }

    pub fn contains(&self, contract: &Address) -> bool {
        self.contracts.contains(contract)
    }
}

/// Function selectors an agent may call. Present but empty allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionAllowlist {
    pub selectors: BTreeSet<Selector>,
}

impl FunctionAllowlist {
    /// Build from canonical function signatures
    pub fn from_signatures<'a>(signatures: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            selectors: signatures.into_iter().map(Selector::of).collect(),
        }
    }

    pub fn contains_signature(&self, signature: &str) -> bool {
        self.selectors.contains(&Selector::of(signature))
    }
}

/// A named bundle of restrictions on what an agent may do.
///
/// Optional parts that are absent impose no restriction of that kind.
/// Spending limits, when present, always apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Assigned by the policy store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PolicyId>,
    /// Per-token ceilings; every limit matching an action's token must admit it
    #[serde(default)]
    pub spending_limits: Vec<SpendingLimit>,
    /// Contracts the agent may call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_allowlist: Option<ContractAllowlist>,
    /// Functions the agent may call, by selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_allowlist: Option<FunctionAllowlist>,
    /// Calendar window outside which every action is denied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    /// Ceiling on authorized actions per period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    /// Assigned by the policy store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spending_limit(mut self, limit: SpendingLimit) -> Self {
        self.spending_limits.push(limit);
        self
    }

    pub fn with_contracts(mut self, contracts: impl IntoIterator<Item = Address>) -> Self {
        self.contract_allowlist = Some(ContractAllowlist::new(contracts));
        self
    }

    pub fn with_functions<'a>(mut self, signatures: impl IntoIterator<Item = &'a str>) -> Self {
        self.function_allowlist = Some(FunctionAllowlist::from_signatures(signatures));
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Parse a policy document
    pub fn from_json(json: &str) -> agentpay_types::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AgentPayError::invalid_policy(format!("malformed policy JSON: {}", e)))
    }
}

/// An action an agent wants to take, as seen by the policy engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Contract being called
    pub contract: Address,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub function_signature: String,
    /// Token whose spending limits apply
    pub token: Address,
    /// Amount moved, in the token's smallest unit
    pub amount: U256,
}

impl Action {
    /// A token transfer through `contract` using `function_signature`
    pub fn new(
        contract: Address,
        function_signature: impl Into<String>,
        token: Address,
        amount: U256,
    ) -> Self {
        Self {
            contract,
            function_signature: function_signature.into(),
            token,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_text_forms() {
        let sel = Selector::of("transfer(address,uint256)");
        assert_eq!(sel.to_string(), "0xa9059cbb");
        assert_eq!("a9059cbb".parse::<Selector>().unwrap(), sel);
        assert_eq!("0xa9059cbb".parse::<Selector>().unwrap(), sel);
        assert!("0xa9059c".parse::<Selector>().is_err());
    }

    #[test]
    fn policy_document_parses() {
        let json = r#"{
            "spending_limits": [{
                "token": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "max_amount": "1000000",
                "period": 86400
            }],
            "contract_allowlist": ["0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"],
            "function_allowlist": ["0xa9059cbb"],
            "rate_limit": { "max_calls": 10, "period": 3600 }
        }"#;
        let policy = Policy::from_json(json).unwrap();

        assert_eq!(policy.spending_limits.len(), 1);
        assert_eq!(policy.spending_limits[0].max_amount, U256::from(1_000_000));
        assert_eq!(policy.spending_limits[0].spent, U256::ZERO);
        assert!(policy
            .function_allowlist
            .as_ref()
            .unwrap()
            .contains_signature("transfer(address,uint256)"));
        assert_eq!(policy.rate_limit.as_ref().unwrap().max_calls, 10);
        assert!(policy.time_window.is_none());
        assert!(policy.id.is_none());
    }

    #[test]
    fn malformed_document_is_invalid_policy() {
        let err = Policy::from_json("{\"spending_limits\": 3}").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_POLICY");
    }
}
