//! Interface catalog types and the human-readable signature parser
//!
//! Catalog entries look like the signatures solidity tooling prints, e.g.
//! `"function balanceOf(address owner) public view returns (uint256)"`.
//! A catalog is parsed once into [`Function`] entries so that encoding and
//! decoding work on typed data rather than re-inspecting strings per call.

use crate::ContractError;
use alloy_primitives::keccak256;
use std::fmt;
use std::str::FromStr;

/// A parameter or return type in a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `address`, a 20-byte account address.
    Address,
    /// `uintN` for N in 8..=256, multiples of 8. Bare `uint` means 256.
    Uint(usize),
    /// `intN` for N in 8..=256, multiples of 8. Bare `int` means 256.
    Int(usize),
    /// `bool`.
    Bool,
    /// `bytesN` for N in 1..=32.
    FixedBytes(usize),
    /// `bytes`, dynamically sized.
    Bytes,
    /// `string`, UTF-8 encoded.
    String,
    /// `T[]`, a dynamically sized array of `T`.
    Array(Box<TypeTag>),
}

impl TypeTag {
    /// Whether the type uses tail encoding (offset in the head, payload in
    /// the tail) under the ABI layout rules.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String | Self::Array(_))
    }

    /// The canonical name used for selector computation (`uint` and `int`
    /// normalize to their 256-bit forms).
    pub fn canonical(&self) -> String {
        match self {
            Self::Address => "address".to_string(),
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::Bool => "bool".to_string(),
            Self::FixedBytes(n) => format!("bytes{n}"),
            Self::Bytes => "bytes".to_string(),
            Self::String => "string".to_string(),
            Self::Array(inner) => format!("{}[]", inner.canonical()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for TypeTag {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| ContractError::Signature {
            signature: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }

        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "uint" => Ok(Self::Uint(256)),
            "int" => Ok(Self::Int(256)),
            _ => {
                if let Some(bits) = s.strip_prefix("uint") {
                    let bits: usize =
                        bits.parse().map_err(|_| invalid("malformed uint width"))?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(invalid("uint width must be a multiple of 8 in 8..=256"));
                    }
                    Ok(Self::Uint(bits))
                } else if let Some(bits) = s.strip_prefix("int") {
                    let bits: usize =
                        bits.parse().map_err(|_| invalid("malformed int width"))?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(invalid("int width must be a multiple of 8 in 8..=256"));
                    }
                    Ok(Self::Int(bits))
                } else if let Some(n) = s.strip_prefix("bytes") {
                    let n: usize = n.parse().map_err(|_| invalid("malformed bytes width"))?;
                    if n == 0 || n > 32 {
                        return Err(invalid("fixed bytes width must be in 1..=32"));
                    }
                    Ok(Self::FixedBytes(n))
                } else {
                    Err(invalid("unknown type"))
                }
            }
        }
    }
}

/// State mutability of a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Reads no state.
    Pure,
    /// Reads state but does not modify it.
    View,
    /// May modify state; rejects attached value.
    #[default]
    NonPayable,
    /// May modify state and accept attached value.
    Payable,
}

/// A parsed catalog entry: name, input types, return types, mutability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// The function name.
    pub name: String,
    /// Declared parameter types, in positional order.
    pub inputs: Vec<TypeTag>,
    /// Declared return types, in positional order.
    pub outputs: Vec<TypeTag>,
    /// Declared state mutability.
    pub mutability: Mutability,
}

impl Function {
    /// Parses a single human-readable signature.
    pub fn parse(signature: &str) -> Result<Self, ContractError> {
        let invalid = |reason: &str| ContractError::Signature {
            signature: signature.to_string(),
            reason: reason.to_string(),
        };

        let body = signature.trim();
        let body = body.strip_prefix("function ").unwrap_or(body).trim_start();

        let open = body.find('(').ok_or_else(|| invalid("missing parameter list"))?;
        let name = body[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid("malformed function name"));
        }

        let close = body[open..]
            .find(')')
            .map(|i| open + i)
            .ok_or_else(|| invalid("unterminated parameter list"))?;
        let inputs = parse_type_list(&body[open + 1..close])
            .map_err(|e| invalid(&format!("bad parameter list: {e}")))?;

        let mut mutability = Mutability::default();
        let mut outputs = Vec::new();
        let mut rest = body[close + 1..].trim();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("returns") {
                let after = after.trim_start();
                let open = after.strip_prefix('(').ok_or_else(|| invalid("malformed returns"))?;
                let close = open.find(')').ok_or_else(|| invalid("unterminated returns"))?;
                outputs = parse_type_list(&open[..close])
                    .map_err(|e| invalid(&format!("bad return list: {e}")))?;
                rest = open[close + 1..].trim();
                continue;
            }
            let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            match &rest[..word_end] {
                "pure" => mutability = Mutability::Pure,
                "view" | "constant" => mutability = Mutability::View,
                "payable" => mutability = Mutability::Payable,
                "nonpayable" => mutability = Mutability::NonPayable,
                // Visibility keywords carry no ABI meaning.
                "public" | "external" | "internal" | "private" | "virtual" | "override" => {}
                other => return Err(invalid(&format!("unexpected token {other:?}"))),
            }
            rest = rest[word_end..].trim_start();
        }

        Ok(Self { name: name.to_string(), inputs, outputs, mutability })
    }

    /// The canonical signature used for selector computation, e.g.
    /// `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(TypeTag::canonical).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    /// The 4-byte call selector: the leading bytes of the keccak-256 hash of
    /// the canonical signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }
}

// Each entry is "type", "type name", or "type location name"; only the
// leading type token matters for the ABI.
fn parse_type_list(list: &str) -> Result<Vec<TypeTag>, ContractError> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|entry| {
            let entry = entry.trim();
            let ty = entry.split_whitespace().next().unwrap_or(entry);
            ty.parse()
        })
        .collect()
}

/// A parsed interface catalog: an ordered set of function signatures supplied
/// by the caller, parsed once and looked up by name per call.
///
/// The catalog holds no other state and is not persisted by the bridge; it is
/// supplied fresh per call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    functions: Vec<Function>,
}

impl Interface {
    /// Parses a catalog of human-readable signatures.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ContractError> {
        let functions = entries
            .iter()
            .map(|entry| Function::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { functions })
    }

    /// Looks up a function by name, failing with
    /// [`ContractError::UnknownFunction`] when absent.
    pub fn function(&self, name: &str) -> Result<&Function, ContractError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ContractError::UnknownFunction { name: name.to_string() })
    }

    /// All parsed entries, in catalog order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_types() {
        assert_eq!("address".parse::<TypeTag>().unwrap(), TypeTag::Address);
        assert_eq!("uint".parse::<TypeTag>().unwrap(), TypeTag::Uint(256));
        assert_eq!("uint8".parse::<TypeTag>().unwrap(), TypeTag::Uint(8));
        assert_eq!("int128".parse::<TypeTag>().unwrap(), TypeTag::Int(128));
        assert_eq!("bytes32".parse::<TypeTag>().unwrap(), TypeTag::FixedBytes(32));
        assert_eq!(
            "uint256[]".parse::<TypeTag>().unwrap(),
            TypeTag::Array(Box::new(TypeTag::Uint(256)))
        );
    }

    #[test]
    fn rejects_malformed_types() {
        assert!("uint7".parse::<TypeTag>().is_err());
        assert!("uint512".parse::<TypeTag>().is_err());
        assert!("bytes33".parse::<TypeTag>().is_err());
        assert!("bytes0".parse::<TypeTag>().is_err());
        assert!("tuple".parse::<TypeTag>().is_err());
    }

    #[test]
    fn parses_full_signature() {
        let f = Function::parse(
            "function balanceOf(address owner) public view returns (uint256)",
        )
        .unwrap();
        assert_eq!(f.name, "balanceOf");
        assert_eq!(f.inputs, vec![TypeTag::Address]);
        assert_eq!(f.outputs, vec![TypeTag::Uint(256)]);
        assert_eq!(f.mutability, Mutability::View);
        assert_eq!(f.signature(), "balanceOf(address)");
    }

    #[test]
    fn parses_bare_signature_without_names() {
        let f = Function::parse("transfer(address,uint256)").unwrap();
        assert_eq!(f.inputs, vec![TypeTag::Address, TypeTag::Uint(256)]);
        assert_eq!(f.outputs, Vec::new());
        assert_eq!(f.mutability, Mutability::NonPayable);
    }

    #[test]
    fn parses_data_location_keywords() {
        let f = Function::parse(
            "function setGreeting(string memory greeting) external returns (bool ok)",
        )
        .unwrap();
        assert_eq!(f.inputs, vec![TypeTag::String]);
        assert_eq!(f.outputs, vec![TypeTag::Bool]);
    }

    #[test]
    fn known_selectors() {
        let transfer = Function::parse("function transfer(address to, uint256 amount)").unwrap();
        assert_eq!(transfer.selector(), [0xa9, 0x05, 0x9c, 0xbb]);

        let balance_of = Function::parse("function balanceOf(address) view returns (uint256)")
            .unwrap();
        assert_eq!(balance_of.selector(), [0x70, 0xa0, 0x82, 0x31]);

        let name = Function::parse("function name() view returns (string)").unwrap();
        assert_eq!(name.selector(), [0x06, 0xfd, 0xde, 0x03]);
    }

    #[test]
    fn unknown_function_lookup_fails() {
        let interface =
            Interface::parse(&["function name() view returns (string)"]).unwrap();
        assert!(interface.function("name").is_ok());
        let err = interface.function("symbol").unwrap_err();
        assert!(matches!(err, ContractError::UnknownFunction { name } if name == "symbol"));
    }

    #[test]
    fn malformed_catalog_entry_fails_parse() {
        let err = Interface::parse(&["function broken(uint7 x)"]).unwrap_err();
        assert!(matches!(err, ContractError::Signature { .. }), "got {err:?}");
    }
}
