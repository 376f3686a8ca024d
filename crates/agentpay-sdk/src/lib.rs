//! AgentPay SDK - Delegated payments for AI agents
//!
//! One client wires together the pieces an application needs:
//!
//! - **Agents**: delegate a wallet's authority to a short-lived session key
//! - **Policies**: spending limits, allowlists, time windows and rate limits
//! - **Budgets**: per-agent ceilings on automatic payments
//! - **x402**: an HTTP transport that pays `402 Payment Required` responses
//!
//! # Quick Start
//!
//! ```ignore
//! use agentpay_sdk::{AgentPayClient, AgentPayConfig};
//!
//! let client = AgentPayClient::new(AgentPayConfig::from_env()?)?;
//! let agent = client.create_agent("research-bot", wallet)?;
//!
//! let transport = client.http_transport(&agent.id)?;
//! let response = transport.send(request).await?;
//! ```

pub mod client;
pub mod config;
pub mod telemetry;

pub use client::AgentPayClient;
pub use config::{AgentPayConfig, HttpSettings, LoggingConfig, X402Settings};
pub use telemetry::init_tracing;

pub use agentpay_agents::{Agent, AgentConfig, AgentStatus};
pub use agentpay_policy::{Action, Policy};
pub use agentpay_types::*;
pub use agentpay_x402::{HttpTransport, PaymentOutcome, X402Transport};
