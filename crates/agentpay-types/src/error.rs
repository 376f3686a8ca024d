//! Error types for AgentPay
//!
//! Every failure is a concrete variant; `kind()` folds them onto the coarse
//! taxonomy callers branch on.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Result type for AgentPay operations
pub type Result<T> = std::result::Result<T, AgentPayError>;

/// Coarse error classification shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Agent or policy lookup missed
    NotFound,
    /// Zero amounts, malformed addresses, malformed hex/JSON, invalid policies
    InvalidInput,
    /// Allowlist, time-window, rate-limit or spending-limit denial
    PolicyViolation,
    /// Per-request or per-period ceiling breach
    BudgetExceeded,
    /// Session key expired, not yet valid, mismatched, or agent inactive
    Unauthorized,
    /// Unparseable payment requirements, no acceptable scheme
    ProtocolError,
    /// Network I/O failure
    TransportError,
    /// Entropy or signing backend failure
    Internal,
}

/// AgentPay error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentPayError {
    // ========================================================================
    // Session Key Errors
    // ========================================================================

    /// Serialized session key could not be decoded
    #[error("Malformed session key data: {reason}")]
    MalformedKeyData { reason: String },

    /// Session key carries no private key
    #[error("Session key has no private key")]
    MissingKey,

    /// Chain id absent or zero
    #[error("Session key chain id must be positive")]
    InvalidChain,

    /// Current time precedes valid-after
    #[error("Session key not valid until {valid_after}")]
    NotYetValid { valid_after: u64 },

    /// Current time is past valid-until
    #[error("Session key expired at {valid_until}")]
    Expired { valid_until: u64 },

    /// Stored address differs from the one derived from the key
    #[error("Session key address {stored} does not match derived address {derived}")]
    AddressMismatch { stored: Address, derived: Address },

    /// Signature backend rejected the digest
    #[error("Signing failed: {reason}")]
    SigningFailed { reason: String },

    /// OS entropy source failed
    #[error("Entropy source failure: {reason}")]
    Entropy { reason: String },

    // ========================================================================
    // Policy Errors
    // ========================================================================

    /// Agent has no policy, so it may take no policy-governed action
    #[error("Agent {agent_id} has no policy")]
    NoPolicy { agent_id: String },

    /// Contract absent from the contract allowlist
    #[error("Contract {contract} is not in the allowlist")]
    ContractNotAllowed { contract: Address },

    /// Function selector absent from the function allowlist
    #[error("Function {signature} is not in the allowlist")]
    FunctionNotAllowed { signature: String },

    /// Action attempted outside the allowed time window
    #[error("Action outside the allowed time window")]
    OutsideTimeWindow,

    /// Call-rate ceiling reached for the current period
    #[error("Rate limit exceeded: {max_calls} calls per {period_secs}s")]
    RateLimitExceeded { max_calls: u64, period_secs: i64 },

    /// Spending limit would be exceeded
    #[error("Spending limit exceeded for token {token}: requested {requested}, remaining {remaining}")]
    ExceedsLimit {
        token: Address,
        requested: U256,
        remaining: U256,
    },

    /// Policy failed structural validation
    #[error("Invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    // ========================================================================
    // Budget Errors
    // ========================================================================

    /// Payee not in a configured, non-empty payee allowlist
    #[error("Payee {payee} not in allowlist")]
    PayeeNotAllowed { payee: Address },

    /// Single payment above the per-request ceiling
    #[error("Amount {requested} exceeds per-request limit {limit}")]
    ExceedsPerRequestLimit { requested: U256, limit: U256 },

    /// Payment would push period spend above the per-period ceiling
    #[error("Amount {requested} exceeds period budget: remaining {remaining}")]
    ExceedsPeriodBudget { requested: U256, remaining: U256 },

    // ========================================================================
    // Lookup Errors
    // ========================================================================

    /// Agent not found
    #[error("Agent {agent_id} not found")]
    AgentNotFound { agent_id: String },

    /// Policy not found
    #[error("Policy {policy_id} not found")]
    PolicyNotFound { policy_id: String },

    /// Agent exists but is revoked or expired
    #[error("Agent {agent_id} is {status}")]
    AgentInactive { agent_id: String, status: String },

    // ========================================================================
    // Protocol & Transport Errors
    // ========================================================================

    /// Payment protocol disagreement
    #[error("Payment protocol error: {reason}")]
    Protocol { reason: String },

    /// Network I/O failure
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AgentPayError {
    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid policy error
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            reason: reason.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map this error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedKeyData { .. }
            | Self::InvalidPolicy { .. }
            | Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::MissingKey
            | Self::InvalidChain
            | Self::NotYetValid { .. }
            | Self::Expired { .. }
            | Self::AddressMismatch { .. }
            | Self::AgentInactive { .. } => ErrorKind::Unauthorized,
            Self::NoPolicy { .. }
            | Self::ContractNotAllowed { .. }
            | Self::FunctionNotAllowed { .. }
            | Self::OutsideTimeWindow
            | Self::RateLimitExceeded { .. }
            | Self::ExceedsLimit { .. }
            | Self::PayeeNotAllowed { .. } => ErrorKind::PolicyViolation,
            Self::ExceedsPerRequestLimit { .. } | Self::ExceedsPeriodBudget { .. } => {
                ErrorKind::BudgetExceeded
            }
            Self::AgentNotFound { .. } | Self::PolicyNotFound { .. } => ErrorKind::NotFound,
            Self::Protocol { .. } => ErrorKind::ProtocolError,
            Self::Transport { .. } => ErrorKind::TransportError,
            Self::SigningFailed { .. } | Self::Entropy { .. } | Self::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Check if this is a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Entropy { .. })
    }

    /// Get an error code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedKeyData { .. } => "MALFORMED_KEY_DATA",
            Self::MissingKey => "MISSING_KEY",
            Self::InvalidChain => "INVALID_CHAIN",
            Self::NotYetValid { .. } => "NOT_YET_VALID",
            Self::Expired { .. } => "EXPIRED",
            Self::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            Self::SigningFailed { .. } => "SIGNING_FAILED",
            Self::Entropy { .. } => "ENTROPY_FAILURE",
            Self::NoPolicy { .. } => "NO_POLICY",
            Self::ContractNotAllowed { .. } => "CONTRACT_NOT_ALLOWED",
            Self::FunctionNotAllowed { .. } => "FUNCTION_NOT_ALLOWED",
            Self::OutsideTimeWindow => "OUTSIDE_TIME_WINDOW",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::ExceedsLimit { .. } => "EXCEEDS_LIMIT",
            Self::InvalidPolicy { .. } => "INVALID_POLICY",
            Self::PayeeNotAllowed { .. } => "PAYEE_NOT_ALLOWED",
            Self::ExceedsPerRequestLimit { .. } => "EXCEEDS_PER_REQUEST_LIMIT",
            Self::ExceedsPeriodBudget { .. } => "EXCEEDS_PERIOD_BUDGET",
            Self::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            Self::PolicyNotFound { .. } => "POLICY_NOT_FOUND",
            Self::AgentInactive { .. } => "AGENT_INACTIVE",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
