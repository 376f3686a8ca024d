//! AgentPay Policy - Delegated authority limits
//!
//! A [`Policy`] bounds what an agent may do with its session key:
//! - per-token spending limits with lazy period reset
//! - contract and function allowlists
//! - a calendar time window
//! - a call-rate limit
//!
//! [`engine`] holds the pure evaluation and composition logic, [`PolicyStore`]
//! the concurrency-safe registry of named policies, and [`encode_policy`] the
//! on-chain representation.

pub mod encode;
pub mod engine;
pub mod model;
pub mod rate_limit;
pub mod spending;
pub mod store;
pub mod time_window;

pub use encode::encode_policy;
pub use engine::{authorize, compose, evaluate, is_allowed, validate};
pub use model::*;
pub use rate_limit::RateLimit;
pub use spending::SpendingLimit;
pub use store::PolicyStore;
pub use time_window::TimeWindow;
