//! secp256k1 recoverable signatures over 32-byte digests
//!
//! Signatures are 65 bytes laid out as `r || s || v`. [`sign_prehash`]
//! produces `v` in `{0, 1}`; [`with_eth_v`] shifts it into the `{27, 28}`
//! convention token contracts expect. Verification and recovery accept both.

use agentpay_types::{Address, AgentPayError, Result, B256};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::keys::address_from_verifying_key;

/// Length of a recoverable signature
pub const SIGNATURE_LENGTH: usize = 65;

/// Sign a 32-byte digest. Returns `r || s || v` with `v` in `{0, 1}`.
pub fn sign_prehash(key: &SigningKey, digest: &B256) -> Result<[u8; SIGNATURE_LENGTH]> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| AgentPayError::SigningFailed {
            reason: e.to_string(),
        })?;

    let mut out = [0u8; SIGNATURE_LENGTH];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Move the recovery byte into the 27/28 convention
pub fn with_eth_v(mut signature: [u8; SIGNATURE_LENGTH]) -> [u8; SIGNATURE_LENGTH] {
    if signature[64] < 27 {
        signature[64] += 27;
    }
    signature
}

/// Check a signature against a public key. Wrong lengths and malformed
/// scalars are a mismatch, not an error.
pub fn verify_prehash(key: &VerifyingKey, digest: &B256, signature: &[u8]) -> bool {
    if signature.len() != SIGNATURE_LENGTH {
        return false;
    }
    let Ok(sig) = Signature::from_slice(&signature[..64]) else {
        return false;
    };
    key.verify_prehash(digest.as_slice(), &sig).is_ok()
}

/// Recover the signer address of a digest
pub fn recover_address(digest: &B256, signature: &[u8]) -> Result<Address> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(AgentPayError::invalid_input(
            "signature",
            format!("expected {} bytes, got {}", SIGNATURE_LENGTH, signature.len()),
        ));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| AgentPayError::invalid_input("signature", e.to_string()))?;
    let v = match signature[64] {
        v @ 0..=1 => v,
        v @ 27..=28 => v - 27,
        other => {
            return Err(AgentPayError::invalid_input(
                "signature",
                format!("invalid recovery byte {}", other),
            ))
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| AgentPayError::invalid_input("signature", "invalid recovery id"))?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|e| AgentPayError::invalid_input("signature", e.to_string()))?;
    Ok(address_from_verifying_key(&key))
}
