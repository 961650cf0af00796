//! JSON-RPC 2.0 envelope types and common parameter shapes

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Method name, e.g. `eth_getBalance`.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Correlation identifier, strictly increasing per client instance.
    pub id: u64,
}

/// A JSON-RPC 2.0 response envelope.
///
/// Exactly one of `result` and `error` is present in a well-formed response.
/// `result` keeps an explicit `Some(Value::Null)` when the node returns a
/// JSON `null` result (e.g. `eth_getTransactionByHash` for an unknown hash),
/// which is distinct from the member being absent.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Correlation identifier echoed by the node.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub id: Option<Value>,
    /// Successful result, mutually exclusive with `error`.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub result: Option<Value>,
    /// Structured error, mutually exclusive with `result`.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The `error` member of a JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional method-specific error payload.
    #[serde(default)]
    pub data: Option<Value>,
}

// Keeps `"result": null` as Some(Value::Null) instead of collapsing it into
// None, so an absent member stays distinguishable from a null result.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Block selector accepted by the `eth_*` query methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BlockTag {
    /// The most recent block.
    #[default]
    Latest,
    /// The genesis block.
    Earliest,
    /// The pending block.
    Pending,
    /// The most recent safe head block.
    Safe,
    /// The most recent finalized block.
    Finalized,
    /// A specific block number as a hex quantity string (e.g. `0x10d4f`).
    Number(String),
}

impl BlockTag {
    /// Returns the wire form of the tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
            Self::Pending => "pending",
            Self::Safe => "safe",
            Self::Finalized => "finalized",
            Self::Number(n) => n,
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BlockTag {
    fn from(s: &str) -> Self {
        match s {
            "latest" | "" => Self::Latest,
            "earliest" => Self::Earliest,
            "pending" => Self::Pending,
            "safe" => Self::Safe,
            "finalized" => Self::Finalized,
            other => Self::Number(other.to_string()),
        }
    }
}

/// Transaction fields for `eth_call`, `eth_estimateGas` and
/// `eth_sendTransaction`.
///
/// All quantity fields are hex quantity strings. Absent fields are omitted
/// from the wire object entirely, matching what nodes expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    /// Sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient or contract address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Gas limit as a hex quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    /// Gas price as a hex quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Transferred value in wei as a hex quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Hex-encoded call data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl TxRequest {
    /// Read-call descriptor: target address plus encoded call data.
    pub fn call(to: impl Into<String>, data: impl Into<String>) -> Self {
        Self { to: Some(to.into()), data: Some(data.into()), ..Default::default() }
    }
}
