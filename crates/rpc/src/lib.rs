//! dappkit JSON-RPC transport
//!
//! A thin JSON-RPC 2.0 client for Ethereum-compatible nodes. The client owns a
//! single endpoint URL and a per-instance request-id counter, serializes method
//! calls into JSON-RPC envelopes, and maps wire-level failures into typed
//! errors. It performs no retries, batching, or connection management of its
//! own; every call is a single POST round trip.
//!
//! All chain quantities (balances, gas, block numbers) are carried as hex
//! quantity strings end to end, so values never round-trip through floating
//! point.

/// JSON-RPC client implementation and typed method wrappers
mod client;
/// Error types surfaced by the transport
mod error;
/// Wire envelope and parameter types
mod types;

pub use client::{RpcClient, RpcClientBuilder};
pub use error::RpcClientError;
pub use types::{BlockTag, RpcErrorObject, RpcRequest, RpcResponse, TxRequest};
