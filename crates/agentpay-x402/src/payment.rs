//! Payment requirement parsing and EIP-3009 payment headers

use agentpay_crypto::{
    keccak256_all, recover_address, u256_word, with_eth_v, Eip712Domain,
    TransferWithAuthorization,
};
use agentpay_session::{SessionKey, SessionKeyManager};
use agentpay_types::{parse_amount, Address, AgentPayError, Result, B256, U256};
use alloy_primitives::address;
use serde::{Deserialize, Serialize};

use crate::types::{PaymentRequirement, X402_VERSION};

/// Circle USDC deployments by chain id
const USDC_CONTRACTS: &[(u64, Address)] = &[
    (1, address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
    (10, address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85")),
    (137, address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359")),
    (8453, address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")),
    (42161, address!("af88d065e77c8cC2239327C5EDb3A432268e5831")),
    (84532, address!("036CbD53842c5426634e7929541eC2318f3dCF7e")),
    (421614, address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d")),
    (11155111, address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238")),
];

/// USDC contract on `chain_id`, if known
pub fn usdc_address(chain_id: u64) -> Option<Address> {
    USDC_CONTRACTS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, addr)| *addr)
}

/// Parse a 402 body: either one requirement object or an array of them
pub fn parse_requirements(body: &[u8]) -> Result<Vec<PaymentRequirement>> {
    if let Ok(list) = serde_json::from_slice::<Vec<PaymentRequirement>>(body) {
        return Ok(list);
    }
    serde_json::from_slice::<PaymentRequirement>(body)
        .map(|single| vec![single])
        .map_err(|e| AgentPayError::protocol(format!("invalid payment requirements: {}", e)))
}

/// First requirement whose scheme is acceptable, in the order offered.
/// With no scheme filter the first requirement wins.
pub fn select_requirement<'a>(
    requirements: &'a [PaymentRequirement],
    allowed_schemes: &[String],
) -> Option<&'a PaymentRequirement> {
    if allowed_schemes.is_empty() {
        return requirements.first();
    }
    requirements
        .iter()
        .find(|r| allowed_schemes.iter().any(|s| s == &r.scheme))
}

/// Authorization nonce: `keccak256(from || to || uint256(amount))`.
///
/// Deterministic, so retrying the same payment can never be redeemed twice.
pub fn payment_nonce(from: &Address, to: &Address, amount: &U256) -> B256 {
    keccak256_all(&[from.as_slice(), to.as_slice(), &u256_word(amount)])
}

/// The `payload` object of a payment header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// 65-byte `r || s || v` signature, hex without prefix, `v` in {27, 28}
    pub signature: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    /// 32-byte nonce, hex without prefix
    pub nonce: String,
}

/// JSON document sent in the `X-PAYMENT` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHeader {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: PaymentPayload,
}

impl PaymentHeader {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AgentPayError::internal(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AgentPayError::protocol(format!("invalid payment header: {}", e)))
    }

    /// Rebuild the signed authorization from the header fields
    pub fn authorization(&self) -> Result<TransferWithAuthorization> {
        let p = &self.payload;
        let nonce = hex::decode(p.nonce.trim_start_matches("0x"))
            .ok()
            .filter(|b| b.len() == 32)
            .map(|b| B256::from_slice(&b))
            .ok_or_else(|| AgentPayError::protocol("nonce must be 32 hex bytes"))?;

        Ok(TransferWithAuthorization {
            from: parse_address("from", &p.from)?,
            to: parse_address("to", &p.to)?,
            value: parse_amount("value", &p.value)?,
            valid_after: parse_amount("validAfter", &p.valid_after)?,
            valid_before: parse_amount("validBefore", &p.valid_before)?,
            nonce,
        })
    }

    /// Address that signed this header under `domain`
    pub fn recover_signer(&self, domain: &Eip712Domain) -> Result<Address> {
        let digest = self.authorization()?.signing_digest(domain);
        let signature = hex::decode(self.payload.signature.trim_start_matches("0x"))
            .map_err(|e| AgentPayError::protocol(format!("invalid signature hex: {}", e)))?;
        recover_address(&digest, &signature)
    }
}

fn parse_address(field: &str, raw: &str) -> Result<Address> {
    raw.parse()
        .map_err(|e| AgentPayError::invalid_input(field, format!("'{}': {}", raw, e)))
}

/// Sign an EIP-3009 authorization paying `requirement` from the session key
/// and wrap it in a payment header.
///
/// The signature is produced only after the session key validates; a key
/// that fails validation fails this call with the validation error.
pub fn build_payment_header(
    sessions: &SessionKeyManager,
    key: &SessionKey,
    requirement: &PaymentRequirement,
    token: Address,
) -> Result<PaymentHeader> {
    let amount = parse_amount("maxAmountRequired", &requirement.max_amount_required)?;
    let valid_before =
        parse_amount("requiredDeadline", &requirement.required_deadline).unwrap_or(U256::ZERO);
    let from = key.address();

    let authorization = TransferWithAuthorization {
        from,
        to: requirement.pay_to,
        value: amount,
        valid_after: U256::ZERO,
        valid_before,
        nonce: payment_nonce(&from, &requirement.pay_to, &amount),
    };
    let domain = Eip712Domain::usdc(key.chain_id(), token);
    let signature = with_eth_v(sessions.sign(key, &authorization.signing_digest(&domain))?);

    Ok(PaymentHeader {
        x402_version: X402_VERSION,
        scheme: requirement.scheme.clone(),
        network: requirement.network.clone(),
        payload: PaymentPayload {
            signature: hex::encode(signature),
            from: from.to_checksum(None),
            to: requirement.pay_to.to_checksum(None),
            value: amount.to_string(),
            valid_after: "0".to_string(),
            valid_before: valid_before.to_string(),
            nonce: hex::encode(authorization.nonce),
        },
    })
}
