//! Contract call encoding
//!
//! A narrow Solidity ABI encoder: a typed argument enum, a parser for the
//! parameter list of a canonical signature, and head/tail encoding. Tuples and
//! fixed-size arrays are not supported.

use agentpay_types::{Address, AgentPayError, Result, U256};

use crate::hash::{address_word, function_selector, u256_word};

const WORD: usize = 32;

/// A parameter type from a canonical signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Uint(usize),
    Bool,
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<AbiType>),
}

impl AbiType {
    /// Parse a canonical type name such as `uint256`, `bytes4[]` or `address`
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(Self::parse(inner)?)));
        }
        if name.ends_with(']') || name.starts_with('(') {
            return Err(AgentPayError::invalid_input(
                "signature",
                format!("unsupported ABI type '{}'", name),
            ));
        }
        match name {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "bytes" => Ok(Self::Bytes),
            "string" => Ok(Self::String),
            "uint" => Ok(Self::Uint(256)),
            _ => {
                if let Some(bits) = name.strip_prefix("uint") {
                    let bits: usize = bits.parse().map_err(|_| unknown_type(name))?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(unknown_type(name));
                    }
                    Ok(Self::Uint(bits))
                } else if let Some(size) = name.strip_prefix("bytes") {
                    let size: usize = size.parse().map_err(|_| unknown_type(name))?;
                    if size == 0 || size > 32 {
                        return Err(unknown_type(name));
                    }
                    Ok(Self::FixedBytes(size))
                } else {
                    Err(unknown_type(name))
                }
            }
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String | Self::Array(_))
    }
}

fn unknown_type(name: &str) -> AgentPayError {
    AgentPayError::invalid_input("signature", format!("unknown ABI type '{}'", name))
}

/// A typed call argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
}

/// Split `name(type,type,...)` into its parameter types
pub fn parse_signature(signature: &str) -> Result<Vec<AbiType>> {
    let open = signature
        .find('(')
        .ok_or_else(|| AgentPayError::invalid_input("signature", "missing '('"))?;
    if !signature.ends_with(')') || open == 0 {
        return Err(AgentPayError::invalid_input(
            "signature",
            format!("'{}' is not a canonical function signature", signature),
        ));
    }
    let params = &signature[open + 1..signature.len() - 1];
    if params.trim().is_empty() {
        return Ok(Vec::new());
    }
    params.split(',').map(AbiType::parse).collect()
}

/// Encode a full call: 4-byte selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Result<Vec<u8>> {
    let types = parse_signature(signature)?;
    if types.len() != args.len() {
        return Err(AgentPayError::invalid_input(
            "args",
            format!("{} expects {} arguments, got {}", signature, types.len(), args.len()),
        ));
    }
    let mut out = function_selector(signature).to_vec();
    out.extend(encode_params(&types, args)?);
    Ok(out)
}

/// Head/tail encode a parameter list
pub fn encode_params(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(AgentPayError::invalid_input("args", "type/value count mismatch"));
    }
    let head_len = WORD * types.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        if ty.is_dynamic() {
            head.extend_from_slice(&u256_word(&U256::from(head_len + tail.len())));
            tail.extend(encode_dynamic(ty, value)?);
        } else {
            head.extend_from_slice(&encode_static(ty, value)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_static(ty: &AbiType, value: &AbiValue) -> Result<[u8; WORD]> {
    match (ty, value) {
        (AbiType::Address, AbiValue::Address(a)) => Ok(address_word(a)),
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if v.bit_len() > *bits {
                return Err(AgentPayError::invalid_input(
                    "args",
                    format!("{} does not fit in uint{}", v, bits),
                ));
            }
            Ok(u256_word(v))
        }
        (AbiType::Bool, AbiValue::Bool(b)) => {
            let mut word = [0u8; WORD];
            word[WORD - 1] = u8::from(*b);
            Ok(word)
        }
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != *size {
                return Err(AgentPayError::invalid_input(
                    "args",
                    format!("bytes{} given {} bytes", size, bytes.len()),
                ));
            }
            let mut word = [0u8; WORD];
            word[..bytes.len()].copy_from_slice(bytes);
            Ok(word)
        }
        _ => Err(mismatch(ty, value)),
    }
}

fn encode_dynamic(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>> {
    match (ty, value) {
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => Ok(encode_packed_bytes(bytes)),
        (AbiType::String, AbiValue::String(s)) => Ok(encode_packed_bytes(s.as_bytes())),
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let mut out = u256_word(&U256::from(items.len())).to_vec();
            let types = vec![(**inner).clone(); items.len()];
            out.extend(encode_params(&types, items)?);
            Ok(out)
        }
        _ => Err(mismatch(ty, value)),
    }
}

fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = u256_word(&U256::from(bytes.len())).to_vec();
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}

fn mismatch(ty: &AbiType, value: &AbiValue) -> AgentPayError {
    AgentPayError::invalid_input("args", format!("value {:?} does not match type {:?}", value, ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_erc20_transfer() {
        let to: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let data = encode_call(
            "transfer(address,uint256)",
            &[AbiValue::Address(to), AbiValue::Uint(U256::from(1000))],
        )
        .unwrap();

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1000));
    }

    #[test]
    fn no_arg_call_is_selector_only() {
        let data = encode_call("totalSupply()", &[]).unwrap();
        assert_eq!(hex::encode(data), "18160ddd");
    }

    #[test]
    fn dynamic_array_uses_offsets() {
        let data = encode_params(
            &[AbiType::Array(Box::new(AbiType::Uint(256))), AbiType::Bool],
            &[
                AbiValue::Array(vec![AbiValue::Uint(U256::from(7)), AbiValue::Uint(U256::from(8))]),
                AbiValue::Bool(true),
            ],
        )
        .unwrap();

        // head: offset(64), true; tail: len 2, 7, 8
        assert_eq!(data.len(), 5 * 32);
        assert_eq!(U256::from_be_slice(&data[0..32]), U256::from(64));
        assert_eq!(data[63], 1);
        assert_eq!(U256::from_be_slice(&data[64..96]), U256::from(2));
        assert_eq!(U256::from_be_slice(&data[96..128]), U256::from(7));
        assert_eq!(U256::from_be_slice(&data[128..160]), U256::from(8));
    }

    #[test]
    fn bytes4_is_right_padded() {
        let data = encode_params(
            &[AbiType::FixedBytes(4)],
            &[AbiValue::FixedBytes(vec![0xa9, 0x05, 0x9c, 0xbb])],
        )
        .unwrap();
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert!(data[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn rejects_argument_count_mismatch() {
        let err = encode_call("transfer(address,uint256)", &[AbiValue::Bool(true)]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn rejects_kind_mismatch() {
        assert!(encode_call("approve(address,uint256)", &[
            AbiValue::Uint(U256::from(1)),
            AbiValue::Uint(U256::from(1)),
        ])
        .is_err());
    }

    #[test]
    fn rejects_oversized_uint() {
        assert!(encode_call("f(uint8)", &[AbiValue::Uint(U256::from(256))]).is_err());
        assert!(encode_call("f(uint8)", &[AbiValue::Uint(U256::from(255))]).is_ok());
    }

    #[test]
    fn rejects_unsupported_types() {
        assert!(parse_signature("f((uint256,address))").is_err());
        assert!(parse_signature("f(uint256[2])").is_err());
        assert!(parse_signature("f(int256)").is_err());
        assert!(parse_signature("noparens").is_err());
    }

    proptest! {
        #[test]
        fn bytes_encoding_is_word_aligned(payload in proptest::collection::vec(any::<u8>(), 0..200)) {
            let data = encode_params(&[AbiType::Bytes], &[AbiValue::Bytes(payload.clone())]).unwrap();
            prop_assert_eq!(data.len() % 32, 0);
            prop_assert_eq!(U256::from_be_slice(&data[32..64]), U256::from(payload.len()));
            prop_assert_eq!(&data[64..64 + payload.len()], &payload[..]);
        }
    }
}
