//! The typed parameter/return value union
//!
//! [`AbiValue`] is the exhaustive tagged union carried across the bridge
//! boundary: callers supply parameters as `AbiValue`s (or as JSON, coerced
//! here), and decoded returns come back as `AbiValue`s. Quantities convert
//! to and from decimal strings so no value ever passes through floating
//! point; addresses render in EIP-55 checksummed form.

use crate::{ContractError, TypeTag};
use alloy_primitives::{hex, Address, I256, U256};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A typed contract-call parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// A 20-byte address.
    Address(Address),
    /// An unsigned integer of up to 256 bits.
    Uint(U256),
    /// A signed integer of up to 256 bits.
    Int(I256),
    /// A boolean.
    Bool(bool),
    /// A fixed-size byte string (`bytesN`).
    FixedBytes(Vec<u8>),
    /// A dynamically sized byte string.
    Bytes(Vec<u8>),
    /// A UTF-8 string.
    String(String),
    /// An array of values of one element type.
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// Whether this value is shaped like the given type tag. Arrays check
    /// every element recursively.
    pub fn matches(&self, ty: &TypeTag) -> bool {
        match (self, ty) {
            (Self::Address(_), TypeTag::Address) => true,
            (Self::Uint(_), TypeTag::Uint(_)) => true,
            (Self::Int(_), TypeTag::Int(_)) => true,
            (Self::Bool(_), TypeTag::Bool) => true,
            (Self::FixedBytes(b), TypeTag::FixedBytes(n)) => b.len() == *n,
            (Self::Bytes(_), TypeTag::Bytes) => true,
            (Self::String(_), TypeTag::String) => true,
            (Self::Array(elems), TypeTag::Array(inner)) => {
                elems.iter().all(|e| e.matches(inner))
            }
            _ => false,
        }
    }

    /// Coerces a JSON value into a typed value according to a declared type.
    ///
    /// Accepted JSON shapes follow what UI/tool collaborators send:
    /// addresses and byte strings as `0x`-prefixed hex strings, integers as
    /// decimal strings, `0x` hex strings, or JSON integers, booleans as JSON
    /// booleans, arrays element-wise.
    pub fn from_json(ty: &TypeTag, value: &Value) -> Result<Self, ContractError> {
        let mismatch = || ContractError::Encode(format!("cannot coerce {value} into {ty}"));

        match ty {
            TypeTag::Address => {
                let s = value.as_str().ok_or_else(mismatch)?;
                let address = Address::from_str(s)
                    .map_err(|e| ContractError::Encode(format!("bad address {s:?}: {e}")))?;
                Ok(Self::Address(address))
            }
            TypeTag::Uint(_) => {
                let u = match value {
                    Value::String(s) => U256::from_str(s)
                        .map_err(|e| ContractError::Encode(format!("bad uint {s:?}: {e}")))?,
                    Value::Number(n) => U256::from(n.as_u64().ok_or_else(mismatch)?),
                    _ => return Err(mismatch()),
                };
                Ok(Self::Uint(u))
            }
            TypeTag::Int(_) => {
                let i = match value {
                    Value::String(s) => I256::from_str(s)
                        .map_err(|e| ContractError::Encode(format!("bad int {s:?}: {e}")))?,
                    Value::Number(n) => I256::try_from(n.as_i64().ok_or_else(mismatch)?)
                        .map_err(|e| ContractError::Encode(format!("bad int {n}: {e}")))?,
                    _ => return Err(mismatch()),
                };
                Ok(Self::Int(i))
            }
            TypeTag::Bool => Ok(Self::Bool(value.as_bool().ok_or_else(mismatch)?)),
            TypeTag::FixedBytes(n) => {
                let bytes = decode_hex_str(value.as_str().ok_or_else(mismatch)?)?;
                if bytes.len() != *n {
                    return Err(ContractError::Encode(format!(
                        "expected {n} bytes for {ty}, got {}",
                        bytes.len()
                    )));
                }
                Ok(Self::FixedBytes(bytes))
            }
            TypeTag::Bytes => {
                Ok(Self::Bytes(decode_hex_str(value.as_str().ok_or_else(mismatch)?)?))
            }
            TypeTag::String => Ok(Self::String(value.as_str().ok_or_else(mismatch)?.to_string())),
            TypeTag::Array(inner) => {
                let elems = value.as_array().ok_or_else(mismatch)?;
                elems.iter().map(|e| Self::from_json(inner, e)).collect::<Result<Vec<_>, _>>().map(Self::Array)
            }
        }
    }

    /// Renders the value as JSON for UI/tool collaborators: quantities as
    /// decimal strings, addresses checksummed, byte strings as `0x` hex.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Address(a) => Value::String(a.to_checksum(None)),
            Self::Uint(u) => Value::String(u.to_string()),
            Self::Int(i) => Value::String(i.to_string()),
            Self::Bool(b) => Value::Bool(*b),
            Self::FixedBytes(b) | Self::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(elems) => Value::Array(elems.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{}", a.to_checksum(None)),
            Self::Uint(u) => write!(f, "{u}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::FixedBytes(b) | Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn decode_hex_str(s: &str) -> Result<Vec<u8>, ContractError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| ContractError::Encode(format!("bad hex {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_json_parameters() {
        let addr = AbiValue::from_json(
            &TypeTag::Address,
            &json!("0x1111111111111111111111111111111111111111"),
        )
        .unwrap();
        assert!(matches!(addr, AbiValue::Address(_)));

        let amount =
            AbiValue::from_json(&TypeTag::Uint(256), &json!("1000000000000000000")).unwrap();
        assert_eq!(amount, AbiValue::Uint(U256::from(10).pow(U256::from(18))));

        let hex_amount = AbiValue::from_json(&TypeTag::Uint(256), &json!("0xde0b6b3a7640000"))
            .unwrap();
        assert_eq!(hex_amount, amount);

        let negative = AbiValue::from_json(&TypeTag::Int(256), &json!(-42)).unwrap();
        assert_eq!(negative, AbiValue::Int(I256::try_from(-42i64).unwrap()));
    }

    #[test]
    fn rejects_mismatched_json() {
        assert!(AbiValue::from_json(&TypeTag::Address, &json!(5)).is_err());
        assert!(AbiValue::from_json(&TypeTag::Uint(256), &json!(true)).is_err());
        assert!(AbiValue::from_json(&TypeTag::FixedBytes(32), &json!("0x1234")).is_err());
    }

    #[test]
    fn addresses_render_checksummed() {
        let addr =
            Address::from_str("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
        assert_eq!(
            AbiValue::Address(addr).to_json(),
            json!("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359")
        );
    }

    #[test]
    fn quantities_render_as_decimal_strings() {
        let supply = U256::from_str("0xd3c21bcecceda1000000").unwrap();
        assert_eq!(AbiValue::Uint(supply).to_json(), json!("1000000000000000000000000"));
    }
}
