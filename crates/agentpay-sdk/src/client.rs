//! The AgentPay client

use std::sync::Arc;

use agentpay_agents::{Agent, AgentConfig, AgentRegistry};
use agentpay_policy::{Action, Policy, PolicyStore};
use agentpay_session::SessionKeyManager;
use agentpay_types::{system_clock, Address, AgentId, AgentPayError, Result, SharedClock};
use agentpay_x402::{BudgetBook, BudgetTracker, HttpTransport, ReqwestTransport, X402Transport};
use tracing::info;

use crate::config::AgentPayConfig;

/// Owns the agent registry, the policy store and per-agent budgets.
///
/// All three share one clock, so lazy expiry and period renewal agree.
#[derive(Debug)]
pub struct AgentPayClient {
    config: AgentPayConfig,
    registry: AgentRegistry,
    policies: PolicyStore,
    budgets: BudgetBook,
}

impl AgentPayClient {
    pub fn new(config: AgentPayConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: AgentPayConfig, clock: SharedClock) -> Result<Self> {
        let budgets = BudgetBook::new(config.x402.policy(), config.x402.period()?, clock.clone());
        Ok(Self {
            registry: AgentRegistry::new(SessionKeyManager::new(clock.clone())),
            policies: PolicyStore::new(clock),
            budgets,
            config,
        })
    }

    pub fn config(&self) -> &AgentPayConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    pub fn budgets(&self) -> &BudgetBook {
        &self.budgets
    }

    /// Delegate to a new agent on the configured chain for the configured
    /// session lifetime
    pub fn create_agent(&self, name: impl Into<String>, wallet: Address) -> Result<Agent> {
        let config = AgentConfig::new(name, wallet, self.config.session_duration()?);
        self.create_agent_with(config)
    }

    /// Delegate with explicit settings. A referenced policy must exist.
    pub fn create_agent_with(&self, config: AgentConfig) -> Result<Agent> {
        if let Some(policy_id) = &config.policy_id {
            self.policies.get(policy_id)?;
        }
        self.registry.create(config, self.config.chain_id)
    }

    pub fn create_policy(&self, policy: Policy) -> Result<Policy> {
        self.policies.create(policy)
    }

    /// Commit `action` against the agent's stored policy. An agent without
    /// a policy is denied every action.
    pub fn authorize(&self, agent_id: &AgentId, action: &Action) -> Result<()> {
        let agent = self.registry.get_active(agent_id)?;
        match &agent.policy_id {
            Some(policy_id) => self.policies.authorize(policy_id, action),
            None => Err(AgentPayError::NoPolicy {
                agent_id: agent_id.to_string(),
            }),
        }
    }

    pub fn revoke_agent(&self, agent_id: &AgentId) -> Result<()> {
        self.registry.revoke(agent_id)
    }

    pub fn budget(&self, agent_id: &AgentId) -> Arc<BudgetTracker> {
        self.budgets.tracker(agent_id)
    }

    /// Wrap `inner` so 402 responses are paid with the agent's session key
    /// and charged to its budget. Inactive agents are refused.
    pub fn payment_transport<T: HttpTransport>(
        &self,
        agent_id: &AgentId,
        inner: T,
    ) -> Result<X402Transport<T>> {
        let agent = self.registry.get_active(agent_id)?;
        let transport = X402Transport::new(
            inner,
            self.registry.sessions().clone(),
            agent.session_key,
            self.config.x402.transport_config(),
        )
        .with_budget(self.budgets.tracker(agent_id))
        .with_policy(self.config.x402.policy());

        info!(agent_id = %agent_id, "Payment transport ready");
        Ok(transport)
    }

    /// [`payment_transport`](Self::payment_transport) over the network
    pub fn http_transport(&self, agent_id: &AgentId) -> Result<X402Transport<ReqwestTransport>> {
        let inner = ReqwestTransport::new(self.config.http.timeout)?;
        self.payment_transport(agent_id, inner)
    }
}
