//! dappkit - blockchain node state and smart-contract interaction
//!
//! The [`ChainService`] facade composes the JSON-RPC transport
//! ([`dappkit_rpc::RpcClient`]) and the contract bridge
//! ([`dappkit_contract::ContractBridge`]) into the named operations consumed
//! by UI, CLI, and tool-protocol collaborators: network/account/block/
//! transaction queries, token reads, raw encode/decode, and the test-node
//! state-manipulation utilities.
//!
//! The facade is stateless apart from the transport's request-id counter; it
//! is cheap to clone and safe to share across concurrent callers.

/// Logging setup shared by dappkit consumers
pub mod logging;
/// The facade and its data transfer types
mod service;

pub use dappkit_contract::{
    AbiValue, ContractBridge, ContractError, Function, Interface, Mutability, TokenMetadata,
    TypeTag,
};
pub use dappkit_rpc::{BlockTag, RpcClient, RpcClientError, TxRequest};
pub use service::{AccountInfo, ChainService, NetworkInfo, ServiceError, TokenInfo, TransactionDetails};
