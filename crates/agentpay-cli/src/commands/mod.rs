//! CLI command implementations

pub mod fetch;
pub mod policy;
pub mod session;
