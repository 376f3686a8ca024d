//! x402 wire types and client settings

use std::collections::HashSet;

use agentpay_types::{decimal_u256, duration_secs, option_decimal_u256, Address, U256};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Header carrying the signed payment on the retried request
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Header a resource may return with a settlement reference
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Protocol version written into every payment header
pub const X402_VERSION: u32 = 1;

/// One way a resource is willing to be paid, as sent in a 402 body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// Payment scheme, e.g. `exact`
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub network: String,
    /// Decimal string in the token's smallest unit
    pub max_amount_required: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mime_type: String,
    /// Recipient of the transfer authorization
    pub pay_to: Address,
    /// Decimal unix timestamp; anything unparseable signs as 0
    #[serde(default)]
    pub required_deadline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

/// A payment the budget tracker has accounted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Resource the payment bought, as named by the requirement or the request URI
    pub resource: String,
    /// Amount paid in the token's smallest unit
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    /// Payee the authorization was signed over to
    pub pay_to: Address,
    /// When the paid retry succeeded
    pub timestamp: DateTime<Utc>,
    /// Network name from the requirement, e.g. `base`
    pub network: String,
    /// Settlement reference from the resource, when it sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,
}

impl PaymentRecord {
    pub fn new(
        resource: impl Into<String>,
        amount: U256,
        pay_to: Address,
        network: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            resource: resource.into(),
            amount,
            pay_to,
            timestamp,
            network: network.into(),
            tx_reference: None,
        }
    }
}

/// Monetary ceilings and allowlists for automatic payments.
///
/// `None` ceilings and empty sets impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct X402Policy {
    /// Largest single payment
    #[serde(default, with = "option_decimal_u256")]
    pub max_per_request: Option<U256>,
    /// Total that may be paid within one budget period
    #[serde(default, with = "option_decimal_u256")]
    pub max_per_period: Option<U256>,
    /// Payees that may receive payments
    #[serde(default)]
    pub allowed_payees: HashSet<Address>,
    /// Hosts (optionally with port) payments may be sent to
    #[serde(default)]
    pub allowed_domains: HashSet<String>,
}

impl X402Policy {
    pub fn payee_allowed(&self, payee: &Address) -> bool {
        self.allowed_payees.is_empty() || self.allowed_payees.contains(payee)
    }

    /// Matches either the bare host or `host:port`, ignoring ASCII case
    pub fn domain_allowed(&self, host: Option<&str>, authority: Option<&str>) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        [host, authority]
            .into_iter()
            .flatten()
            .any(|h| self.allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(h)))
    }
}

/// How the payment transport behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X402Config {
    /// Pay 402 responses without asking the caller
    pub auto_pay: bool,
    /// Acceptable schemes in no particular order; empty accepts the first offer
    pub allowed_schemes: Vec<String>,
    /// Token whose EIP-712 domain is signed under; defaults to USDC on the
    /// session key's chain
    pub token_contract: Option<Address>,
}

impl Default for X402Config {
    fn default() -> Self {
        Self {
            auto_pay: true,
            allowed_schemes: Vec::new(),
            token_contract: None,
        }
    }
}

/// Snapshot of a tracker's accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Everything tracked since the tracker was created
    #[serde(with = "decimal_u256")]
    pub total_spent: U256,
    /// Spend since `period_start`
    #[serde(with = "decimal_u256")]
    pub period_spent: U256,
    /// Start of the current period, moved forward on renewal
    pub period_start: DateTime<Utc>,
    /// Zero disables period resets
    #[serde(with = "duration_secs")]
    pub period_duration: Duration,
    pub records: Vec<PaymentRecord>,
}

impl BudgetState {
    pub fn new(period_start: DateTime<Utc>, period_duration: Duration) -> Self {
        Self {
            total_spent: U256::ZERO,
            period_spent: U256::ZERO,
            period_start,
            period_duration,
            records: Vec::new(),
        }
    }
}
