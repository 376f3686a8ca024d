//! AgentPay Types - Canonical types for delegated agent payments
//!
//! This crate has no dependencies on other agentpay crates. It defines:
//!
//! - The error taxonomy shared by every component
//! - Injected clocks for lazy, read-triggered state transitions
//! - Agent and policy identifiers
//! - Token amount parsing and serde adapters
//!
//! EVM primitives (`Address`, `U256`, `B256`) are re-exported from
//! `alloy-primitives` so downstream crates agree on one representation.

pub mod amount;
pub mod clock;
pub mod error;
pub mod identity;

pub use amount::*;
pub use clock::*;
pub use error::*;
pub use identity::*;

pub use alloy_primitives::{Address, B256, U256};
