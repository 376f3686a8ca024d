//! Session key lifecycle: generation, validation, signing

use agentpay_crypto::{address_from_signing_key, sign_prehash, verify_prehash, SIGNATURE_LENGTH};
use agentpay_types::{system_clock, AgentPayError, Clock, Result, SharedClock, B256};
use chrono::Duration;
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::key::SessionKey;

/// Issues and checks session keys against an injected clock
#[derive(Debug, Clone)]
pub struct SessionKeyManager {
    clock: SharedClock,
}

impl Default for SessionKeyManager {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl SessionKeyManager {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Generate a fresh key valid from now until `now + duration`.
    ///
    /// Only an OS entropy failure can make this fail. A duration that runs
    /// past the representable range saturates `valid_until`.
    pub fn generate(&self, chain_id: u64, duration: Duration) -> Result<SessionKey> {
        let signing_key = random_signing_key()?;
        let now = self.clock.now();
        let valid_after = now.timestamp().max(0) as u64;
        let valid_until = now.timestamp().saturating_add(duration.num_seconds()).max(0) as u64;

        let key = SessionKey::from_signing_key(signing_key, chain_id, valid_after, valid_until);
        debug!(
            address = %key.address(),
            chain_id,
            valid_until,
            "Generated session key"
        );
        Ok(key)
    }

    /// Check a key in fixed order: private key present, chain id, not yet
    /// valid, expired, address derivation. The first failure wins.
    pub fn validate(&self, key: &SessionKey) -> Result<()> {
        let signing_key = key.signing_key().ok_or(AgentPayError::MissingKey)?;

        if key.chain_id() == 0 {
            return Err(AgentPayError::InvalidChain);
        }

        let now = self.clock.unix_seconds();
        if now < key.valid_after() {
            return Err(AgentPayError::NotYetValid {
                valid_after: key.valid_after(),
            });
        }
        if now > key.valid_until() {
            return Err(AgentPayError::Expired {
                valid_until: key.valid_until(),
            });
        }

        let derived = address_from_signing_key(signing_key);
        if derived != key.address() {
            return Err(AgentPayError::AddressMismatch {
                stored: key.address(),
                derived,
            });
        }

        Ok(())
    }

    /// Validate, then sign a 32-byte digest. The signature is `r || s || v`
    /// with `v` in `{0, 1}`.
    pub fn sign(&self, key: &SessionKey, digest: &B256) -> Result<[u8; SIGNATURE_LENGTH]> {
        self.validate(key)?;
        let signing_key = key.signing_key().ok_or(AgentPayError::MissingKey)?;
        sign_prehash(signing_key, digest)
    }
}

/// Signature predicate. Malformed input is `false`, never an error.
pub fn verify(public_key: &VerifyingKey, digest: &B256, signature: &[u8]) -> bool {
    verify_prehash(public_key, digest, signature)
}

fn random_signing_key() -> Result<SigningKey> {
    let mut bytes = [0u8; 32];
    loop {
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AgentPayError::Entropy {
                reason: e.to_string(),
            })?;
        // Zero or out-of-range scalars are resampled.
        if let Ok(key) = SigningKey::from_bytes((&bytes).into()) {
            return Ok(key);
        }
    }
}
