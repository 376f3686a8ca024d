//! Tracing subscriber setup

use agentpay_types::{AgentPayError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AgentPayError::invalid_input("logging.level", e.to_string()))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| AgentPayError::internal(format!("tracing init: {}", e)))
}
