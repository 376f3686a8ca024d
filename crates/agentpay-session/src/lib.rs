//! AgentPay Session - Delegated signing authority for agents
//!
//! A session key is a short-lived secp256k1 keypair that a wallet owner hands
//! to an agent. It is bound to one chain and a validity window, and every
//! signature it produces is preceded by a validation pass against the
//! manager's clock.
//!
//! ```ignore
//! let manager = SessionKeyManager::default();
//! let key = manager.generate(8453, chrono::Duration::hours(24))?;
//! let stored = key.serialize()?;
//! let restored = SessionKey::deserialize(&stored)?;
//! let sig = manager.sign(&restored, &digest)?;
//! ```

pub mod key;
pub mod manager;

pub use key::*;
pub use manager::*;
