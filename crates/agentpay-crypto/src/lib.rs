//! AgentPay Crypto - Ethereum-compatible primitives for delegated payments
//!
//! This crate provides:
//! - Keccak-256 hashing and function selectors
//! - secp256k1 key handling and address derivation
//! - Recoverable ECDSA signatures over 32-byte digests
//! - EIP-712 digests for EIP-3009 transfer authorizations
//! - ABI encoding of contract calls
//!
//! All failures surface as [`agentpay_types::AgentPayError`].

pub mod abi;
pub mod eip712;
pub mod hash;
pub mod keys;
pub mod signature;

pub use abi::*;
pub use eip712::*;
pub use hash::*;
pub use keys::*;
pub use signature::*;

pub use k256::ecdsa::{SigningKey, VerifyingKey};
