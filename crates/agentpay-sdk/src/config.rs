//! Client configuration
//!
//! Defaults, then a JSON document or `AGENTPAY_*` environment variables on top.
//! Durations are human readable (`"30s"`, `"24h"`); amounts are decimal
//! strings in the token's smallest unit.

use std::time::Duration;

use agentpay_types::{option_decimal_u256, parse_amount, Address, AgentPayError, Result, U256};
use agentpay_x402::{X402Config, X402Policy};
use serde::{Deserialize, Serialize};

/// Everything an [`AgentPayClient`](crate::AgentPayClient) needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPayConfig {
    /// Chain new session keys are bound to
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Lifetime of a new agent's session key
    #[serde(default = "default_session_duration", with = "humantime_serde")]
    pub session_duration: Duration,

    #[serde(default)]
    pub x402: X402Settings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Automatic payment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct X402Settings {
    #[serde(default = "default_true")]
    pub auto_pay: bool,

    #[serde(default)]
    pub allowed_schemes: Vec<String>,

    /// Budget renewal period; zero never renews
    #[serde(default = "default_budget_period", with = "humantime_serde")]
    pub budget_period: Duration,

    #[serde(default, with = "option_decimal_u256")]
    pub max_per_request: Option<U256>,

    #[serde(default, with = "option_decimal_u256")]
    pub max_per_period: Option<U256>,

    #[serde(default)]
    pub allowed_payees: Vec<Address>,

    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Overrides the per-chain USDC contract
    #[serde(default)]
    pub token_contract: Option<Address>,
}

impl Default for X402Settings {
    fn default() -> Self {
        Self {
            auto_pay: true,
            allowed_schemes: Vec::new(),
            budget_period: default_budget_period(),
            max_per_request: None,
            max_per_period: None,
            allowed_payees: Vec::new(),
            allowed_domains: Vec::new(),
            token_contract: None,
        }
    }
}

impl X402Settings {
    pub fn policy(&self) -> X402Policy {
        X402Policy {
            max_per_request: self.max_per_request,
            max_per_period: self.max_per_period,
            allowed_payees: self.allowed_payees.iter().copied().collect(),
            allowed_domains: self
                .allowed_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn transport_config(&self) -> X402Config {
        X402Config {
            auto_pay: self.auto_pay,
            allowed_schemes: self.allowed_schemes.clone(),
            token_contract: self.token_contract,
        }
    }

    pub fn period(&self) -> Result<chrono::Duration> {
        to_chrono("budget_period", self.budget_period)
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AgentPayConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            session_duration: default_session_duration(),
            x402: X402Settings::default(),
            http: HttpSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_chain_id() -> u64 {
    8453
}

fn default_session_duration() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_budget_period() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl AgentPayConfig {
    /// Load `.env` if present, then overlay `AGENTPAY_*` variables on the defaults
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AgentPayError::invalid_input("config", e.to_string()))
    }

    /// Apply variables from `lookup` over `self`. Unset variables keep their
    /// current value; list variables are comma separated.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AGENTPAY_CHAIN_ID") {
            self.chain_id = v
                .trim()
                .parse()
                .map_err(|_| AgentPayError::invalid_input("AGENTPAY_CHAIN_ID", v.clone()))?;
        }
        if let Some(v) = lookup("AGENTPAY_SESSION_DURATION") {
            self.session_duration = parse_duration("AGENTPAY_SESSION_DURATION", &v)?;
        }
        if let Some(v) = lookup("AGENTPAY_AUTO_PAY") {
            self.x402.auto_pay = parse_bool("AGENTPAY_AUTO_PAY", &v)?;
        }
        if let Some(v) = lookup("AGENTPAY_ALLOWED_SCHEMES") {
            self.x402.allowed_schemes = split_list(&v);
        }
        if let Some(v) = lookup("AGENTPAY_BUDGET_PERIOD") {
            self.x402.budget_period = parse_duration("AGENTPAY_BUDGET_PERIOD", &v)?;
        }
        if let Some(v) = lookup("AGENTPAY_MAX_PER_REQUEST") {
            self.x402.max_per_request = Some(parse_amount("AGENTPAY_MAX_PER_REQUEST", v.trim())?);
        }
        if let Some(v) = lookup("AGENTPAY_MAX_PER_PERIOD") {
            self.x402.max_per_period = Some(parse_amount("AGENTPAY_MAX_PER_PERIOD", v.trim())?);
        }
        if let Some(v) = lookup("AGENTPAY_ALLOWED_PAYEES") {
            self.x402.allowed_payees = split_list(&v)
                .iter()
                .map(|a| parse_address("AGENTPAY_ALLOWED_PAYEES", a))
                .collect::<Result<_>>()?;
        }
        if let Some(v) = lookup("AGENTPAY_ALLOWED_DOMAINS") {
            self.x402.allowed_domains = split_list(&v);
        }
        if let Some(v) = lookup("AGENTPAY_TOKEN_CONTRACT") {
            self.x402.token_contract = Some(parse_address("AGENTPAY_TOKEN_CONTRACT", v.trim())?);
        }
        if let Some(v) = lookup("AGENTPAY_HTTP_TIMEOUT") {
            self.http.timeout = parse_duration("AGENTPAY_HTTP_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("AGENTPAY_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("AGENTPAY_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(self)
    }

    pub fn session_duration(&self) -> Result<chrono::Duration> {
        to_chrono("session_duration", self.session_duration)
    }
}

fn parse_duration(name: &str, raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw.trim())
        .map_err(|e| AgentPayError::invalid_input(name, format!("'{}': {}", raw, e)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AgentPayError::invalid_input(name, format!("'{}' is not a boolean", raw))),
    }
}

fn parse_address(name: &str, raw: &str) -> Result<Address> {
    raw.parse()
        .map_err(|e| AgentPayError::invalid_input(name, format!("'{}': {}", raw, e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_chrono(name: &str, duration: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|e| AgentPayError::invalid_input(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = AgentPayConfig::default();
        assert_eq!(config.chain_id, 8453);
        assert!(config.x402.auto_pay);
        assert_eq!(config.http.timeout, Duration::from_secs(30));
        assert_eq!(config.session_duration().unwrap(), chrono::Duration::hours(24));
        assert_eq!(config.x402.policy(), X402Policy::default());
    }

    #[test]
    fn json_document_with_human_durations() {
        let config = AgentPayConfig::from_json_str(
            r#"{
                "chain_id": 84532,
                "session_duration": "2h",
                "x402": {
                    "allowed_schemes": ["exact"],
                    "budget_period": "1day",
                    "max_per_request": "1000000",
                    "max_per_period": "5000000",
                    "allowed_domains": ["API.Example.com"]
                },
                "http": { "timeout": "5s" },
                "logging": { "level": "debug", "format": "json" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.chain_id, 84532);
        assert_eq!(config.session_duration, Duration::from_secs(7200));
        assert_eq!(config.x402.budget_period, Duration::from_secs(86400));
        assert_eq!(config.x402.max_per_request, Some(U256::from(1_000_000)));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.logging.format, "json");

        let policy = config.x402.policy();
        assert!(policy.domain_allowed(Some("api.example.com"), None));
        assert_eq!(config.x402.transport_config().allowed_schemes, vec!["exact"]);
    }

    #[test]
    fn json_rejects_bad_amounts() {
        let err = AgentPayConfig::from_json_str(r#"{"x402":{"max_per_request":"-5"}}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn environment_overlay() {
        let config = AgentPayConfig::default()
            .overlay(env(&[
                ("AGENTPAY_CHAIN_ID", "1"),
                ("AGENTPAY_AUTO_PAY", "off"),
                ("AGENTPAY_ALLOWED_SCHEMES", "exact, upto,"),
                ("AGENTPAY_MAX_PER_PERIOD", "250"),
                (
                    "AGENTPAY_ALLOWED_PAYEES",
                    "0x1111111111111111111111111111111111111111",
                ),
                ("AGENTPAY_HTTP_TIMEOUT", "90s"),
                ("AGENTPAY_LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.chain_id, 1);
        assert!(!config.x402.auto_pay);
        assert_eq!(config.x402.allowed_schemes, vec!["exact", "upto"]);
        assert_eq!(config.x402.max_per_period, Some(U256::from(250)));
        assert_eq!(config.x402.allowed_payees, vec![Address::repeat_byte(0x11)]);
        assert_eq!(config.http.timeout, Duration::from_secs(90));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn environment_overlay_reports_variable() {
        let err = AgentPayConfig::default()
            .overlay(env(&[("AGENTPAY_SESSION_DURATION", "forever")]))
            .unwrap_err();
        assert!(err.to_string().contains("AGENTPAY_SESSION_DURATION"));

        let err = AgentPayConfig::default()
            .overlay(env(&[("AGENTPAY_CHAIN_ID", "base")]))
            .unwrap_err();
        assert!(err.to_string().contains("AGENTPAY_CHAIN_ID"));
    }
}
