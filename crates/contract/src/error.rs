//! Error taxonomy for catalog parsing, the ABI codec, and contract calls

use dappkit_rpc::RpcClientError;
use thiserror::Error;

/// Errors surfaced by the contract bridge and ABI codec.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The requested function name is absent from the supplied interface
    /// catalog. Raised before any network call is issued.
    #[error("function {name:?} not found in interface catalog")]
    UnknownFunction {
        /// The function name that was looked up.
        name: String,
    },

    /// A catalog entry could not be parsed as a function signature.
    #[error("invalid signature {signature:?}: {reason}")]
    Signature {
        /// The offending catalog entry.
        signature: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// The supplied parameters do not match the function's declared input
    /// types.
    #[error("encode error: {0}")]
    Encode(String),

    /// The returned bytes cannot be decoded against the declared return
    /// types (wrong length, malformed dynamic offsets, empty data against a
    /// non-empty return list).
    #[error("decode error: {0}")]
    Decode(String),

    /// The underlying transport or node call failed.
    #[error(transparent)]
    Rpc(#[from] RpcClientError),
}
