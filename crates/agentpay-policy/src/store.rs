//! In-memory policy store

use std::collections::HashMap;

use agentpay_types::{system_clock, AgentPayError, Clock, PolicyId, Result, SharedClock};
use parking_lot::RwLock;
use tracing::info;

use crate::engine;
use crate::model::{Action, Policy};

/// Owns every stored policy behind one reader/writer lock.
///
/// Reads return clones; `authorize` takes the write lock so counter updates
/// for one policy never interleave.
#[derive(Debug)]
pub struct PolicyStore {
    policies: RwLock<HashMap<PolicyId, Policy>>,
    clock: SharedClock,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl PolicyStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Validate and store a policy under a fresh id
    pub fn create(&self, mut policy: Policy) -> Result<Policy> {
        engine::validate(&policy)?;

        let id = PolicyId::new();
        policy.id = Some(id.clone());
        policy.created_at = Some(self.clock.now());

        self.policies.write().insert(id.clone(), policy.clone());
        info!(policy_id = %id, limits = policy.spending_limits.len(), "Policy created");
        Ok(policy)
    }

    pub fn get(&self, id: &PolicyId) -> Result<Policy> {
        self.policies
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// All policies, oldest first
    pub fn list(&self) -> Vec<Policy> {
        let mut all: Vec<Policy> = self.policies.read().values().cloned().collect();
        all.sort_by_key(|p| p.created_at);
        all
    }

    pub fn delete(&self, id: &PolicyId) -> Result<()> {
        if self.policies.write().remove(id).is_none() {
            return Err(not_found(id));
        }
        info!(policy_id = %id, "Policy deleted");
        Ok(())
    }

    /// Read-only evaluation of an action against a stored policy
    pub fn evaluate(&self, id: &PolicyId, action: &Action) -> Result<()> {
        let policies = self.policies.read();
        let policy = policies.get(id).ok_or_else(|| not_found(id))?;
        engine::evaluate(policy, action, self.clock.now())
    }

    /// Evaluate and commit an action's rate and spending counters
    pub fn authorize(&self, id: &PolicyId, action: &Action) -> Result<()> {
        let mut policies = self.policies.write();
        let policy = policies.get_mut(id).ok_or_else(|| not_found(id))?;
        engine::authorize(policy, action, self.clock.now())
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

fn not_found(id: &PolicyId) -> AgentPayError {
    AgentPayError::PolicyNotFound {
        policy_id: id.to_string(),
    }
}
