//! Contract call bridge over the JSON-RPC transport
//!
//! [`ContractBridge`] composes the signature catalog, the ABI codec, and the
//! transport's `eth_call` primitive. It holds no state between calls beyond
//! the shared [`RpcClient`]; every invocation is self-contained
//! (catalog + address + params in, decoded values out).

use crate::{codec, AbiValue, ContractError, Interface};
use alloy_primitives::{hex, Address, U256};
use dappkit_rpc::{BlockTag, RpcClient, TxRequest};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed single-entry catalog for the raw balance convenience.
static ERC20_BALANCE: Lazy<Interface> = Lazy::new(|| {
    Interface::parse(&["function balanceOf(address owner) public view returns (uint256)"])
        .expect("static catalog parses")
});

/// Fixed catalog for the four ERC-20 metadata read functions.
static ERC20_METADATA: Lazy<Interface> = Lazy::new(|| {
    Interface::parse(&[
        "function name() public view returns (string)",
        "function symbol() public view returns (string)",
        "function decimals() public view returns (uint8)",
        "function totalSupply() public view returns (uint256)",
    ])
    .expect("static catalog parses")
});

/// ERC-20 metadata assembled from four independent read calls.
///
/// Loaded leniently: each field is populated on its own and one field's
/// failure leaves only that field unset. No defaults are applied here; any
/// fallback (such as treating missing `decimals` as 18) is a presentation
/// policy of the consuming layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    /// The token name, when `name()` succeeded.
    pub name: Option<String>,
    /// The token symbol, when `symbol()` succeeded.
    pub symbol: Option<String>,
    /// The token's decimal places, when `decimals()` succeeded.
    pub decimals: Option<u8>,
    /// The total supply in base units, when `totalSupply()` succeeded.
    pub total_supply: Option<U256>,
}

/// Encoder/decoder for contract calls, bound to one [`RpcClient`].
#[derive(Debug, Clone)]
pub struct ContractBridge {
    client: Arc<RpcClient>,
}

impl ContractBridge {
    /// Creates a bridge over the given transport.
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    /// Calls a read-only contract function and decodes its return values.
    ///
    /// Validates the function against the catalog (failing with
    /// [`ContractError::UnknownFunction`] before any network I/O), encodes
    /// the parameters, issues `eth_call` against the latest block, and
    /// decodes the returned bytes against the declared return types.
    pub async fn call_function(
        &self,
        address: &str,
        interface: &Interface,
        function_name: &str,
        params: &[AbiValue],
    ) -> Result<Vec<AbiValue>, ContractError> {
        let function = interface.function(function_name)?;
        let data = codec::encode_call(function, params)?;

        debug!("calling {} on {}", function.signature(), address);

        let raw = self
            .client
            .call(&TxRequest::call(address, format!("0x{}", hex::encode(data))), BlockTag::Latest)
            .await?;
        let bytes = decode_hex_return(function_name, &raw)?;
        codec::decode_result(function, &bytes)
    }

    /// Builds calldata without a network round trip, for callers that submit
    /// transactions themselves (`eth_sendTransaction` /
    /// `eth_sendRawTransaction`).
    pub fn encode_call(
        &self,
        interface: &Interface,
        function_name: &str,
        params: &[AbiValue],
    ) -> Result<Vec<u8>, ContractError> {
        codec::encode_call(interface.function(function_name)?, params)
    }

    /// Decodes raw return bytes against a catalog entry's declared return
    /// types, without a network round trip.
    pub fn decode_result(
        &self,
        interface: &Interface,
        function_name: &str,
        data: &[u8],
    ) -> Result<Vec<AbiValue>, ContractError> {
        codec::decode_result(interface.function(function_name)?, data)
    }

    /// Fetches the raw ERC-20 balance of `owner` at `token`.
    ///
    /// Returns the unscaled base-unit integer; decimal scaling is a
    /// presentation concern.
    pub async fn token_balance(
        &self,
        token: &str,
        owner: &str,
    ) -> Result<U256, ContractError> {
        let owner: Address = owner
            .parse()
            .map_err(|e| ContractError::Encode(format!("bad owner address {owner:?}: {e}")))?;
        let values = self
            .call_function(token, &ERC20_BALANCE, "balanceOf", &[AbiValue::Address(owner)])
            .await?;
        match values.first() {
            Some(AbiValue::Uint(balance)) => Ok(*balance),
            other => Err(ContractError::Decode(format!(
                "balanceOf returned {other:?} instead of a uint256"
            ))),
        }
    }

    /// Fetches ERC-20 metadata via four independent, concurrent read calls.
    ///
    /// Lenient per field: a failed or undecodable field is logged and left
    /// unset without failing the other three.
    pub async fn token_metadata(&self, token: &str) -> Result<TokenMetadata, ContractError> {
        let (name, symbol, decimals, total_supply) = futures::join!(
            self.call_function(token, &ERC20_METADATA, "name", &[]),
            self.call_function(token, &ERC20_METADATA, "symbol", &[]),
            self.call_function(token, &ERC20_METADATA, "decimals", &[]),
            self.call_function(token, &ERC20_METADATA, "totalSupply", &[]),
        );

        Ok(TokenMetadata {
            name: field(token, "name", name).and_then(into_string),
            symbol: field(token, "symbol", symbol).and_then(into_string),
            decimals: field(token, "decimals", decimals).and_then(into_u8),
            total_supply: field(token, "totalSupply", total_supply).and_then(into_uint),
        })
    }
}

fn field(
    token: &str,
    name: &str,
    result: Result<Vec<AbiValue>, ContractError>,
) -> Option<Vec<AbiValue>> {
    match result {
        Ok(values) => Some(values),
        Err(e) => {
            warn!("{name}() failed for token {token}: {e}");
            None
        }
    }
}

fn into_string(values: Vec<AbiValue>) -> Option<String> {
    match values.into_iter().next() {
        Some(AbiValue::String(s)) => Some(s),
        _ => None,
    }
}

fn into_uint(values: Vec<AbiValue>) -> Option<U256> {
    match values.into_iter().next() {
        Some(AbiValue::Uint(u)) => Some(u),
        _ => None,
    }
}

fn into_u8(values: Vec<AbiValue>) -> Option<u8> {
    into_uint(values).and_then(|u| u8::try_from(u).ok())
}

fn decode_hex_return(function_name: &str, raw: &str) -> Result<Vec<u8>, ContractError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped).map_err(|e| {
        ContractError::Decode(format!("{function_name} returned malformed hex data: {e}"))
    })
}
