//! dappkit contract bridge
//!
//! Encoding and decoding of contract calls against a caller-supplied
//! interface catalog of human-readable function signatures, plus the network
//! round trip through [`dappkit_rpc::RpcClient`]'s `eth_call` primitive.
//!
//! The catalog is parsed once into typed [`Function`] entries, so no string
//! inspection happens at call time. Parameters and return values travel as
//! the exhaustive [`AbiValue`] union; the ABI word layout (4-byte selector,
//! 32-byte words, head/tail offsets for dynamic types) is implemented in
//! [`codec`].

/// The contract bridge and ERC-20 conveniences
mod bridge;
/// ABI word-layout encoding and decoding
pub mod codec;
/// Error taxonomy for catalog parsing, codec, and calls
mod error;
/// Interface catalog types and the signature parser
mod types;
/// The typed parameter/return value union
mod value;

pub use bridge::{ContractBridge, TokenMetadata};
pub use error::ContractError;
pub use types::{Function, Interface, Mutability, TypeTag};
pub use value::AbiValue;
