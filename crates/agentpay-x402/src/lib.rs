//! AgentPay x402 - Automatic payments for HTTP 402 responses
//!
//! This crate provides:
//! - Requirement parsing and scheme selection for `402 Payment Required` bodies
//! - EIP-3009 `TransferWithAuthorization` signing with a session key
//! - [`BudgetTracker`]: per-agent spend ceilings with renew-on-touch periods
//! - [`X402Transport`]: a decorator over any [`HttpTransport`] that pays and
//!   retries once
//! - [`ReqwestTransport`]: the default network transport
//!
//! Payments are recorded only after the paid retry returns 2xx.

pub mod budget;
pub mod payment;
pub mod transport;
pub mod types;

pub use budget::{BudgetBook, BudgetTracker};
pub use payment::{
    build_payment_header, parse_requirements, payment_nonce, select_requirement, usdc_address,
    PaymentHeader, PaymentPayload,
};
pub use transport::{DeclineReason, HttpTransport, PaymentOutcome, ReqwestTransport, X402Transport};
pub use types::*;
