//! Agent registry with lazy expiry

use std::collections::HashMap;

use agentpay_crypto::keccak256_all;
use agentpay_session::SessionKeyManager;
use agentpay_types::{checked_deadline, Address, AgentId, AgentPayError, Clock, Result};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info};

use crate::agent::{Agent, AgentConfig, AgentStatus};

/// Derive an agent id: first 16 bytes of keccak(session address || wallet address)
pub fn derive_agent_id(session_address: &Address, wallet_address: &Address) -> AgentId {
    let hash = keccak256_all(&[session_address.as_slice(), wallet_address.as_slice()]);
    AgentId::from_hex(hex::encode(&hash[..16]))
}

/// Concurrency-safe store of delegated agents.
///
/// Expiry is never scheduled: every read compares the clock against
/// `expires_at` and upgrades `Active` agents to `Expired` before returning.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Agent>>,
    sessions: SessionKeyManager,
}

impl AgentRegistry {
    pub fn new(sessions: SessionKeyManager) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionKeyManager {
        &self.sessions
    }

    /// Create an agent with a fresh session key for `chain_id`
    pub fn create(&self, config: AgentConfig, chain_id: u64) -> Result<Agent> {
        let now = self.sessions.clock().now();
        let expires_at = checked_deadline("duration", now, config.duration)?;
        let session_key = self.sessions.generate(chain_id, config.duration)?;
        let id = derive_agent_id(&session_key.address(), &config.wallet_address);

        let agent = Agent {
            id: id.clone(),
            name: config.name,
            wallet_address: config.wallet_address,
            session_key,
            status: AgentStatus::Active,
            created_at: now,
            expires_at,
            permissions: config.permissions,
            policy_id: config.policy_id,
        };

        self.agents.write().insert(id.clone(), agent.clone());
        info!(
            agent_id = %id,
            wallet = %agent.wallet_address,
            session = %agent.session_key.address(),
            expires_at = %agent.expires_at,
            "Agent created"
        );
        Ok(agent)
    }

    /// Fetch an agent, applying lazy expiry
    pub fn get(&self, id: &AgentId) -> Result<Agent> {
        let now = self.sessions.clock().now();
        let agents = self.agents.upgradable_read();
        let agent = agents.get(id).ok_or_else(|| AgentPayError::AgentNotFound {
            agent_id: id.to_string(),
        })?;

        if !agent.needs_expiry(now) {
            return Ok(agent.clone());
        }

        let mut agents = RwLockUpgradableReadGuard::upgrade(agents);
        let agent = agents.get_mut(id).ok_or_else(|| AgentPayError::AgentNotFound {
            agent_id: id.to_string(),
        })?;
        if agent.refresh_status(now) {
            debug!(agent_id = %id, "Agent expired");
        }
        Ok(agent.clone())
    }

    /// Agents owned by `wallet`, with lazy expiry applied, ordered by creation
    pub fn list(&self, wallet: &Address) -> Vec<Agent> {
        let now = self.sessions.clock().now();
        let agents = self.agents.upgradable_read();

        let stale = agents
            .values()
            .any(|a| &a.wallet_address == wallet && a.needs_expiry(now));

        let mut result: Vec<Agent> = if stale {
            let mut agents = RwLockUpgradableReadGuard::upgrade(agents);
            agents
                .values_mut()
                .filter(|a| &a.wallet_address == wallet)
                .map(|a| {
                    if a.refresh_status(now) {
                        debug!(agent_id = %a.id, "Agent expired");
                    }
                    a.clone()
                })
                .collect()
        } else {
            agents
                .values()
                .filter(|a| &a.wallet_address == wallet)
                .cloned()
                .collect()
        };

        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        result
    }

    /// Mark an agent revoked. Revocation is permanent.
    pub fn revoke(&self, id: &AgentId) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents.get_mut(id).ok_or_else(|| AgentPayError::AgentNotFound {
            agent_id: id.to_string(),
        })?;
        agent.status = AgentStatus::Revoked;
        info!(agent_id = %id, "Agent revoked");
        Ok(())
    }

    /// Fetch an agent and require it to be `Active`
    pub fn get_active(&self, id: &AgentId) -> Result<Agent> {
        let agent = self.get(id)?;
        if !agent.status.is_active() {
            return Err(AgentPayError::AgentInactive {
                agent_id: id.to_string(),
                status: agent.status.to_string(),
            });
        }
        Ok(agent)
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}
