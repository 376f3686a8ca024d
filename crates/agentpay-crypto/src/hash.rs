//! Keccak hashing utilities

use agentpay_types::{Address, B256, U256};
use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of data
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    B256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// Compute the Keccak-256 hash of the concatenation of several items
pub fn keccak256_all(items: &[&[u8]]) -> B256 {
    let mut hasher = Keccak256::new();
    for item in items {
        hasher.update(item);
    }
    B256::from_slice(&hasher.finalize())
}

/// Leading 4 bytes of the hash of a canonical function signature,
/// e.g. `transfer(address,uint256)` -> `a9059cbb`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Hex form of [`function_selector`], lowercase without prefix
pub fn selector_hex(signature: &str) -> String {
    hex::encode(function_selector(signature))
}

/// Left-pad to a 32-byte word. Longer inputs keep their rightmost 32 bytes.
pub fn left_pad32(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    if bytes.len() >= 32 {
        word.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        word[32 - bytes.len()..].copy_from_slice(bytes);
    }
    word
}

/// An address as an ABI word
pub fn address_word(address: &Address) -> [u8; 32] {
    left_pad32(address.as_slice())
}

/// A uint256 as an ABI word
pub fn u256_word(value: &U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256([0u8; 0])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn well_known_selectors() {
        assert_eq!(selector_hex("transfer(address,uint256)"), "a9059cbb");
        assert_eq!(selector_hex("approve(address,uint256)"), "095ea7b3");
        assert_eq!(selector_hex("balanceOf(address)"), "70a08231");
    }

    #[test]
    fn keccak_all_matches_concatenation() {
        let joined = keccak256(b"helloworld");
        let parts = keccak256_all(&[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn left_pad_cases() {
        assert_eq!(left_pad32(&[1, 2])[30..], [1, 2]);
        assert!(left_pad32(&[1, 2])[..30].iter().all(|b| *b == 0));
        assert_eq!(left_pad32(&[]), [0u8; 32]);

        let long: Vec<u8> = (0..40).collect();
        assert_eq!(left_pad32(&long)[..], long[8..]);
    }
}
