//! Error taxonomy for the JSON-RPC transport

use thiserror::Error;

/// Errors surfaced by [`RpcClient`](crate::RpcClient).
///
/// The client never retries or substitutes defaults; every failure is
/// propagated so that callers can branch on the failure kind. The offending
/// method name is attached wherever the node was actually reached.
#[derive(Debug, Error)]
pub enum RpcClientError {
    /// The underlying HTTP request could not complete (DNS failure,
    /// connection refused, collaborator-configured timeout).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node returned a structured JSON-RPC error envelope.
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        /// Method name of the offending request.
        method: String,
        /// Error code reported by the node.
        code: i64,
        /// Human-readable message reported by the node.
        message: String,
    },

    /// The response body was not a well-formed JSON-RPC envelope, or its
    /// correlation id did not match the request.
    #[error("invalid response for {method}: {reason}")]
    InvalidResponse {
        /// Method name of the offending request.
        method: String,
        /// What was wrong with the envelope.
        reason: String,
    },
}
