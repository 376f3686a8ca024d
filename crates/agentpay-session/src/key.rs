//! The session key entity and its wire form

use std::fmt;

use agentpay_crypto::{address_from_signing_key, left_pad32, signing_key_from_bytes};
use agentpay_types::{Address, AgentPayError, Result};
use k256::ecdsa::{SigningKey, VerifyingKey};

/// Length of the decoded wire form: scalar, chain id, valid-after, valid-until
pub const SERIALIZED_LENGTH: usize = 128;

const FIELD: usize = 32;

/// A delegated signing key scoped to one chain and a validity window.
///
/// The address is derived from the private scalar at construction; the only
/// way to hold a key whose address disagrees is [`SessionKey::from_raw_parts`],
/// and validation rejects such keys.
#[derive(Clone)]
pub struct SessionKey {
    signing_key: Option<SigningKey>,
    address: Address,
    chain_id: u64,
    valid_after: u64,
    valid_until: u64,
}

impl SessionKey {
    /// Wrap a signing key, deriving its address
    pub fn from_signing_key(
        signing_key: SigningKey,
        chain_id: u64,
        valid_after: u64,
        valid_until: u64,
    ) -> Self {
        let address = address_from_signing_key(&signing_key);
        Self {
            signing_key: Some(signing_key),
            address,
            chain_id,
            valid_after,
            valid_until,
        }
    }

    /// Assemble a key from stored parts without re-deriving the address.
    ///
    /// Used when restoring keys from external storage; run the result through
    /// `SessionKeyManager::validate` before trusting it.
    pub fn from_raw_parts(
        signing_key: Option<SigningKey>,
        address: Address,
        chain_id: u64,
        valid_after: u64,
        valid_until: u64,
    ) -> Self {
        Self {
            signing_key,
            address,
            chain_id,
            valid_after,
            valid_until,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Unix seconds from which the key may sign
    pub fn valid_after(&self) -> u64 {
        self.valid_after
    }

    /// Unix seconds after which the key is expired
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }

    pub fn has_private_key(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Public half of the key, if the private half is present
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        self.signing_key.as_ref().map(|k| *k.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> Option<&SigningKey> {
        self.signing_key.as_ref()
    }

    /// Hex-encode the 128-byte wire form.
    ///
    /// Layout: private scalar, chain id, valid-after, valid-until; each field
    /// a 32-byte big-endian word.
    pub fn serialize(&self) -> Result<String> {
        let key = self.signing_key.as_ref().ok_or(AgentPayError::MissingKey)?;

        let mut data = Vec::with_capacity(SERIALIZED_LENGTH);
        data.extend_from_slice(&key.to_bytes());
        data.extend_from_slice(&left_pad32(&self.chain_id.to_be_bytes()));
        data.extend_from_slice(&left_pad32(&self.valid_after.to_be_bytes()));
        data.extend_from_slice(&left_pad32(&self.valid_until.to_be_bytes()));
        Ok(hex::encode(data))
    }

    /// Decode the wire form produced by [`SessionKey::serialize`].
    ///
    /// Public key and address are re-derived from the scalar. Bytes past the
    /// first 128 are ignored. Besides bad hex and short input, a scalar that is
    /// not a valid secp256k1 key or a chain-id or validity word with non-zero
    /// bytes above the low 64 bits is rejected as `MalformedKeyData`.
    pub fn deserialize(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let encoded = encoded.strip_prefix("0x").unwrap_or(encoded);
        let data = hex::decode(encoded).map_err(|e| AgentPayError::MalformedKeyData {
            reason: format!("invalid hex: {}", e),
        })?;
        if data.len() < SERIALIZED_LENGTH {
            return Err(AgentPayError::MalformedKeyData {
                reason: format!(
                    "expected {} bytes, got {}",
                    SERIALIZED_LENGTH,
                    data.len()
                ),
            });
        }

        let mut scalar = [0u8; FIELD];
        scalar.copy_from_slice(&data[..FIELD]);
        let signing_key = signing_key_from_bytes(&scalar)?;

        let chain_id = word_to_u64("chain id", &data[FIELD..2 * FIELD])?;
        let valid_after = word_to_u64("valid-after", &data[2 * FIELD..3 * FIELD])?;
        let valid_until = word_to_u64("valid-until", &data[3 * FIELD..4 * FIELD])?;

        Ok(Self::from_signing_key(
            signing_key,
            chain_id,
            valid_after,
            valid_until,
        ))
    }
}

fn word_to_u64(field: &str, word: &[u8]) -> Result<u64> {
    let (high, low) = word.split_at(FIELD - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(AgentPayError::MalformedKeyData {
            reason: format!("{} does not fit in 64 bits", field),
        });
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("valid_after", &self.valid_after)
            .field("valid_until", &self.valid_until)
            .field("has_private_key", &self.signing_key.is_some())
            .finish()
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        let same_key = match (&self.signing_key, &other.signing_key) {
            (Some(a), Some(b)) => a.to_bytes() == b.to_bytes(),
            (None, None) => true,
            _ => false,
        };
        same_key
            && self.address == other.address
            && self.chain_id == other.chain_id
            && self.valid_after == other.valid_after
            && self.valid_until == other.valid_until
    }
}

impl Eq for SessionKey {}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_one() -> SigningKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        signing_key_from_bytes(&bytes).unwrap()
    }

    #[test]
    fn serialized_layout() {
        let key = SessionKey::from_signing_key(scalar_one(), 8453, 100, 200);
        let encoded = key.serialize().unwrap();
        assert_eq!(encoded.len(), 256);

        let raw = hex::decode(&encoded).unwrap();
        assert_eq!(raw[31], 1);
        assert_eq!(u64::from_be_bytes(raw[56..64].try_into().unwrap()), 8453);
        assert_eq!(u64::from_be_bytes(raw[88..96].try_into().unwrap()), 100);
        assert_eq!(u64::from_be_bytes(raw[120..128].try_into().unwrap()), 200);
    }

    #[test]
    fn deserialize_restores_every_field() {
        let key = SessionKey::from_signing_key(scalar_one(), 1, 1_700_000_000, 1_700_003_600);
        let back = SessionKey::deserialize(&key.serialize().unwrap()).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.chain_id(), 1);
        assert_eq!(back.valid_after(), 1_700_000_000);
        assert_eq!(back.valid_until(), 1_700_003_600);
    }

    #[test]
    fn deserialize_rejects_short_and_bad_hex() {
        assert!(matches!(
            SessionKey::deserialize(&"00".repeat(127)),
            Err(AgentPayError::MalformedKeyData { .. })
        ));
        assert!(matches!(
            SessionKey::deserialize("zz"),
            Err(AgentPayError::MalformedKeyData { .. })
        ));
    }

    #[test]
    fn deserialize_rejects_zero_scalar() {
        assert!(matches!(
            SessionKey::deserialize(&"00".repeat(128)),
            Err(AgentPayError::MalformedKeyData { .. })
        ));
    }

    #[test]
    fn deserialize_rejects_words_wider_than_u64() {
        let key = SessionKey::from_signing_key(scalar_one(), 1, 0, 10);
        let mut raw = hex::decode(key.serialize().unwrap()).unwrap();
        raw[32] = 1;
        let err = SessionKey::deserialize(&hex::encode(raw)).unwrap_err();
        assert!(err.to_string().contains("chain id"));
    }

    #[test]
    fn serialize_without_key_fails() {
        let key = SessionKey::from_raw_parts(None, Address::ZERO, 1, 0, 10);
        assert_eq!(key.serialize(), Err(AgentPayError::MissingKey));
    }

    #[test]
    fn debug_hides_private_scalar() {
        let key = SessionKey::from_signing_key(scalar_one(), 1, 0, 10);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("has_private_key: true"));
        assert!(!rendered.contains(&hex::encode(scalar_one().to_bytes())));
    }
}
