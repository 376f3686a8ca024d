//! Agent entity

use std::fmt;

use agentpay_session::SessionKey;
use agentpay_types::{Address, AgentId, PolicyId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Revoked,
    Expired,
}

impl AgentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Revoked => write!(f, "revoked"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// What the wallet owner asks for when delegating
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub wallet_address: Address,
    pub duration: Duration,
    pub permissions: Vec<String>,
    /// Stored policy that bounds this agent, if any
    pub policy_id: Option<PolicyId>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, wallet_address: Address, duration: Duration) -> Self {
        Self {
            name: name.into(),
            wallet_address,
            duration,
            permissions: Vec::new(),
            policy_id: None,
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policy(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = Some(policy_id);
        self
    }
}

/// A delegated agent. Owns its session key exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub wallet_address: Address,
    pub session_key: SessionKey,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub permissions: Vec<String>,
    pub policy_id: Option<PolicyId>,
}

impl Agent {
    /// Upgrade `Active` to `Expired` once `now` is past `expires_at`.
    /// Returns whether the status changed. Revoked agents stay revoked.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.needs_expiry(now) {
            self.status = AgentStatus::Expired;
            return true;
        }
        false
    }

    pub(crate) fn needs_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status == AgentStatus::Active && now > self.expires_at
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
