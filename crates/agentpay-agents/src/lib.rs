//! AgentPay Agents - Registry of delegated agents
//!
//! An agent pairs a human wallet with a freshly generated session key. Agent
//! ids are content-derived, so every creation yields a new id without a
//! counter. Status moves `Active -> Revoked` on request and
//! `Active -> Expired` lazily on read.

pub mod agent;
pub mod registry;

pub use agent::*;
pub use registry::*;
