//! EIP-712 typed structured data hashing for EIP-3009 transfer authorizations

use agentpay_types::{Address, B256, U256};

use crate::hash::{address_word, keccak256, keccak256_all, u256_word};

/// Canonical type string of the domain struct
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Canonical type string of the EIP-3009 authorization struct
pub const TRANSFER_WITH_AUTHORIZATION_TYPE: &str = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

/// Signing domain of a token contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: U256,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Domain of Circle's USDC deployments (`name = "USD Coin"`, `version = "2"`)
    pub fn usdc(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: U256::from(chain_id),
            verifying_contract,
        }
    }

    /// The domain separator hash
    pub fn separator(&self) -> B256 {
        keccak256_all(&[
            keccak256(EIP712_DOMAIN_TYPE.as_bytes()).as_slice(),
            keccak256(self.name.as_bytes()).as_slice(),
            keccak256(self.version.as_bytes()).as_slice(),
            &u256_word(&self.chain_id),
            &address_word(&self.verifying_contract),
        ])
    }
}

/// An EIP-3009 `TransferWithAuthorization` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferWithAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub valid_after: U256,
    pub valid_before: U256,
    pub nonce: B256,
}

impl TransferWithAuthorization {
    /// The struct hash
    pub fn struct_hash(&self) -> B256 {
        keccak256_all(&[
            keccak256(TRANSFER_WITH_AUTHORIZATION_TYPE.as_bytes()).as_slice(),
            &address_word(&self.from),
            &address_word(&self.to),
            &u256_word(&self.value),
            &u256_word(&self.valid_after),
            &u256_word(&self.valid_before),
            self.nonce.as_slice(),
        ])
    }

    /// The digest to sign under `domain`
    pub fn signing_digest(&self, domain: &Eip712Domain) -> B256 {
        typed_data_digest(&domain.separator(), &self.struct_hash())
    }
}

/// `keccak256(0x19 0x01 || domainSeparator || structHash)`
pub fn typed_data_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
    keccak256_all(&[&[0x19, 0x01], domain_separator.as_slice(), struct_hash.as_slice()])
}
