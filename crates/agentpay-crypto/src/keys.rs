//! secp256k1 key helpers

use agentpay_types::{Address, AgentPayError, Result};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use sha3::{Digest, Keccak256};

/// Derive the 20-byte account address: keccak256 of the uncompressed public
/// key without its `0x04` prefix, last 20 bytes.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Address of a signing key's public half
pub fn address_from_signing_key(key: &SigningKey) -> Address {
    address_from_verifying_key(key.verifying_key())
}

/// Rebuild a signing key from its 32-byte scalar
pub fn signing_key_from_bytes(bytes: &[u8; 32]) -> Result<SigningKey> {
    SigningKey::from_bytes(bytes.into())
        .map_err(|_| AgentPayError::MalformedKeyData {
            reason: "private scalar is zero or not below the curve order".to_string(),
        })
}
