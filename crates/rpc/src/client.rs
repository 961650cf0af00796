//! JSON-RPC 2.0 transport client and typed method wrappers

use crate::{BlockTag, RpcClientError, RpcRequest, RpcResponse, TxRequest};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-RPC 2.0 client for an Ethereum-compatible node.
///
/// Each instance owns its endpoint URL and a request-id counter that starts
/// at 1 and increases strictly across calls, including concurrent calls from
/// the same instance. Ids are never reused; a failed call still consumes its
/// id, so ids are not required to be contiguous on the wire.
///
/// The client holds no connection state beyond the underlying
/// [`reqwest::Client`] and attempts no retries or batching. Callers wanting a
/// request deadline configure it at construction via
/// [`RpcClient::builder`]; none is applied by default.
#[derive(Debug)]
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

/// Builder for [`RpcClient`] with optional transport-level settings.
#[derive(Debug, Clone)]
pub struct RpcClientBuilder {
    endpoint: String,
    timeout: Option<Duration>,
}

impl RpcClientBuilder {
    /// Creates a builder targeting the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), timeout: None }
    }

    /// Sets a deadline for each outbound request.
    ///
    /// The core itself enforces no timeout; this is the collaborator-level
    /// knob for callers that want one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<RpcClient, RpcClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(RpcClient { endpoint: self.endpoint, http: builder.build()?, next_id: AtomicU64::new(1) })
    }
}

impl RpcClient {
    /// Creates a client for the given endpoint URL with default transport
    /// settings (no request timeout).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), http: reqwest::Client::new(), next_id: AtomicU64::new(1) }
    }

    /// Returns a builder for configuring transport-level settings.
    pub fn builder(endpoint: impl Into<String>) -> RpcClientBuilder {
        RpcClientBuilder::new(endpoint)
    }

    /// Returns the endpoint URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a raw JSON-RPC call and returns the unwrapped `result`.
    ///
    /// Builds the envelope with the next request id, POSTs it to the
    /// endpoint, and correlates the response id against the request before
    /// unwrapping. An `error` member short-circuits into
    /// [`RpcClientError::Rpc`] with the method name attached; the `result`
    /// value is otherwise returned unmodified, any further decoding being the
    /// caller's responsibility.
    pub async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest { jsonrpc: "2.0", method: method.to_string(), params, id };

        debug!("sending {} (id {}) to {}", method, id, self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let envelope: RpcResponse =
            response.json().await.map_err(|e| RpcClientError::InvalidResponse {
                method: method.to_string(),
                reason: format!("body is not a JSON-RPC envelope: {e}"),
            })?;

        if !Self::id_matches(envelope.id.as_ref(), id) {
            warn!("response id mismatch for {} (expected {}, got {:?})", method, id, envelope.id);
            return Err(RpcClientError::InvalidResponse {
                method: method.to_string(),
                reason: format!("response id {:?} does not match request id {id}", envelope.id),
            });
        }

        if let Some(error) = envelope.error {
            warn!("{} failed with code {}: {}", method, error.code, error.message);
            return Err(RpcClientError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        envelope.result.ok_or_else(|| RpcClientError::InvalidResponse {
            method: method.to_string(),
            reason: "envelope carries neither result nor error".to_string(),
        })
    }

    // Some nodes echo the id as a number, some as its decimal string form.
    fn id_matches(echoed: Option<&Value>, id: u64) -> bool {
        match echoed {
            Some(value) => match value {
                Value::Number(n) => n.as_u64() == Some(id),
                Value::String(s) => s.parse::<u64>().ok() == Some(id),
                _ => false,
            },
            None => false,
        }
    }

    /// Like [`send`](Self::send), but expects a string result (the common
    /// case for hex quantity and hex data returns).
    async fn send_str(&self, method: &str, params: Vec<Value>) -> Result<String, RpcClientError> {
        let result = self.send(method, params).await?;
        match result {
            Value::String(s) => Ok(s),
            other => Err(RpcClientError::InvalidResponse {
                method: method.to_string(),
                reason: format!("expected a string result, got {other}"),
            }),
        }
    }

    // -- Network methods ----------------------------------------------------

    /// `eth_chainId`: the chain id as a hex quantity.
    pub async fn chain_id(&self) -> Result<String, RpcClientError> {
        self.send_str("eth_chainId", vec![]).await
    }

    /// `net_version`: the network id as a decimal string.
    pub async fn network_version(&self) -> Result<String, RpcClientError> {
        self.send_str("net_version", vec![]).await
    }

    /// `eth_gasPrice`: the current gas price in wei as a hex quantity.
    pub async fn gas_price(&self) -> Result<String, RpcClientError> {
        self.send_str("eth_gasPrice", vec![]).await
    }

    /// `eth_blockNumber`: the latest block number as a hex quantity.
    pub async fn block_number(&self) -> Result<String, RpcClientError> {
        self.send_str("eth_blockNumber", vec![]).await
    }

    // -- Account methods ----------------------------------------------------

    /// `eth_getBalance`: account balance in wei as a hex quantity.
    pub async fn balance(&self, address: &str, tag: BlockTag) -> Result<String, RpcClientError> {
        self.send_str("eth_getBalance", vec![json!(address), json!(tag.as_str())]).await
    }

    /// `eth_getTransactionCount`: the account nonce as a hex quantity.
    pub async fn transaction_count(
        &self,
        address: &str,
        tag: BlockTag,
    ) -> Result<String, RpcClientError> {
        self.send_str("eth_getTransactionCount", vec![json!(address), json!(tag.as_str())]).await
    }

    /// `eth_getCode`: the deployed bytecode at an address as hex data.
    pub async fn code(&self, address: &str, tag: BlockTag) -> Result<String, RpcClientError> {
        self.send_str("eth_getCode", vec![json!(address), json!(tag.as_str())]).await
    }

    // -- Block methods ------------------------------------------------------

    /// `eth_getBlockByNumber`: a block object, with full transaction bodies
    /// when `full_transactions` is set, transaction hashes otherwise.
    pub async fn block_by_number(
        &self,
        tag: BlockTag,
        full_transactions: bool,
    ) -> Result<Value, RpcClientError> {
        self.send("eth_getBlockByNumber", vec![json!(tag.as_str()), json!(full_transactions)])
            .await
    }

    // -- Transaction methods ------------------------------------------------

    /// `eth_sendTransaction`: submits a transaction, returning its hash.
    pub async fn send_transaction(&self, tx: &TxRequest) -> Result<String, RpcClientError> {
        self.send_str("eth_sendTransaction", vec![json!(tx)]).await
    }

    /// `eth_sendRawTransaction`: submits a signed transaction, returning its
    /// hash.
    pub async fn send_raw_transaction(&self, signed: &str) -> Result<String, RpcClientError> {
        self.send_str("eth_sendRawTransaction", vec![json!(signed)]).await
    }

    /// `eth_getTransactionByHash`: the transaction object, or `Value::Null`
    /// when the node does not know the hash.
    pub async fn transaction_by_hash(&self, hash: &str) -> Result<Value, RpcClientError> {
        self.send("eth_getTransactionByHash", vec![json!(hash)]).await
    }

    /// `eth_getTransactionReceipt`: the receipt object, or `Value::Null` for
    /// pending or unknown transactions.
    pub async fn transaction_receipt(&self, hash: &str) -> Result<Value, RpcClientError> {
        self.send("eth_getTransactionReceipt", vec![json!(hash)]).await
    }

    // -- Call and estimation ------------------------------------------------

    /// `eth_call`: executes a read-only call, returning the raw hex return
    /// data.
    pub async fn call(&self, tx: &TxRequest, tag: BlockTag) -> Result<String, RpcClientError> {
        self.send_str("eth_call", vec![json!(tx), json!(tag.as_str())]).await
    }

    /// `eth_estimateGas`: estimated gas for a prospective transaction as a
    /// hex quantity.
    pub async fn estimate_gas(&self, tx: &TxRequest) -> Result<String, RpcClientError> {
        self.send_str("eth_estimateGas", vec![json!(tx)]).await
    }

    // -- Storage ------------------------------------------------------------

    /// `eth_getStorageAt`: the raw 32-byte storage word at a slot.
    pub async fn storage_at(
        &self,
        address: &str,
        slot: &str,
        tag: BlockTag,
    ) -> Result<String, RpcClientError> {
        self.send_str("eth_getStorageAt", vec![json!(address), json!(slot), json!(tag.as_str())])
            .await
    }

    // -- Node utilities -----------------------------------------------------

    /// `eth_accounts`: the addresses managed by the node, in node order.
    pub async fn accounts(&self) -> Result<Vec<String>, RpcClientError> {
        let result = self.send("eth_accounts", vec![]).await?;
        serde_json::from_value(result).map_err(|e| RpcClientError::InvalidResponse {
            method: "eth_accounts".to_string(),
            reason: format!("expected an array of addresses: {e}"),
        })
    }

    /// `eth_coinbase`: the node's coinbase address.
    pub async fn coinbase(&self) -> Result<String, RpcClientError> {
        self.send_str("eth_coinbase", vec![]).await
    }

    /// `eth_mining`: whether the node is actively mining.
    pub async fn is_mining(&self) -> Result<bool, RpcClientError> {
        let result = self.send("eth_mining", vec![]).await?;
        result.as_bool().ok_or_else(|| RpcClientError::InvalidResponse {
            method: "eth_mining".to_string(),
            reason: format!("expected a boolean result, got {result}"),
        })
    }

    /// `eth_hashrate`: the node's hashrate as a hex quantity.
    pub async fn hashrate(&self) -> Result<String, RpcClientError> {
        self.send_str("eth_hashrate", vec![]).await
    }

    // -- Test-node utilities (hardhat_* / evm_*) ----------------------------
    //
    // Only meaningful against a development node (Hardhat, Anvil). Block
    // counts for hardhat_mine go on the wire as decimal strings per the
    // hardhat convention; evm_* time parameters stay native numbers.

    /// `hardhat_impersonateAccount`: lets subsequent transactions be sent
    /// from an address without its key.
    pub async fn impersonate_account(&self, address: &str) -> Result<(), RpcClientError> {
        self.send("hardhat_impersonateAccount", vec![json!(address)]).await.map(|_| ())
    }

    /// `hardhat_stopImpersonatingAccount`: ends an impersonation started by
    /// [`impersonate_account`](Self::impersonate_account).
    pub async fn stop_impersonating_account(&self, address: &str) -> Result<(), RpcClientError> {
        self.send("hardhat_stopImpersonatingAccount", vec![json!(address)]).await.map(|_| ())
    }

    /// `hardhat_setBalance`: force-sets an account balance (hex quantity).
    pub async fn set_balance(&self, address: &str, balance: &str) -> Result<(), RpcClientError> {
        self.send("hardhat_setBalance", vec![json!(address), json!(balance)]).await.map(|_| ())
    }

    /// `hardhat_setCode`: force-sets the bytecode at an address.
    pub async fn set_code(&self, address: &str, code: &str) -> Result<(), RpcClientError> {
        self.send("hardhat_setCode", vec![json!(address), json!(code)]).await.map(|_| ())
    }

    /// `hardhat_setStorageAt`: force-sets a raw storage slot.
    pub async fn set_storage_at(
        &self,
        address: &str,
        slot: &str,
        value: &str,
    ) -> Result<(), RpcClientError> {
        self.send("hardhat_setStorageAt", vec![json!(address), json!(slot), json!(value)])
            .await
            .map(|_| ())
    }

    /// `hardhat_mine`: mines `blocks` new blocks.
    pub async fn mine(&self, blocks: u64) -> Result<(), RpcClientError> {
        self.send("hardhat_mine", vec![json!(blocks.to_string())]).await.map(|_| ())
    }

    /// `hardhat_mine` up to a target block number.
    pub async fn mine_up_to(&self, block_number: u64) -> Result<(), RpcClientError> {
        self.send("hardhat_mine", vec![json!(block_number.to_string())]).await.map(|_| ())
    }

    /// `evm_increaseTime` followed by mining exactly one block, so the new
    /// timestamp is observable on chain.
    pub async fn increase_time(&self, seconds: u64) -> Result<(), RpcClientError> {
        self.send("evm_increaseTime", vec![json!(seconds)]).await?;
        self.mine(1).await
    }

    /// `evm_setNextBlockTimestamp`: pins the next block's timestamp.
    pub async fn set_next_block_timestamp(&self, timestamp: u64) -> Result<(), RpcClientError> {
        self.send("evm_setNextBlockTimestamp", vec![json!(timestamp)]).await.map(|_| ())
    }

    /// `evm_snapshot`: snapshots chain state, returning an opaque id.
    pub async fn snapshot(&self) -> Result<String, RpcClientError> {
        self.send_str("evm_snapshot", vec![]).await
    }

    /// `evm_revert`: reverts chain state to a snapshot id.
    pub async fn revert(&self, snapshot_id: &str) -> Result<(), RpcClientError> {
        self.send("evm_revert", vec![json!(snapshot_id)]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Responds with the given `result`, echoing the request's id so the
    /// client-side correlation check passes.
    struct RpcResult(Value);

    impl Respond for RpcResult {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": self.0,
            }))
        }
    }

    async fn mock_node(result: Value) -> (RpcClient, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(RpcResult(result))
            .mount(&server)
            .await;
        (RpcClient::new(server.uri()), server)
    }

    async fn sent_requests(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn request_ids_strictly_increase() {
        let (client, server) = mock_node(json!("0x1")).await;

        for _ in 0..5 {
            client.block_number().await.unwrap();
        }

        let ids: Vec<u64> =
            sent_requests(&server).await.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn concurrent_calls_get_distinct_ids() {
        let (client, server) = mock_node(json!("0x1")).await;

        futures::future::try_join_all((0..8).map(|_| client.block_number())).await.unwrap();

        let mut ids: Vec<u64> =
            sent_requests(&server).await.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn error_envelope_becomes_rpc_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "execution reverted" }
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(server.uri());
        let err = client
            .call(&TxRequest::call("0x1111111111111111111111111111111111111111", "0x"), BlockTag::Latest)
            .await
            .unwrap_err();

        match err {
            RpcClientError::Rpc { method, code, message } => {
                assert_eq!(method, "eth_call");
                assert_eq!(code, -32000);
                assert_eq!(message, "execution reverted");
            }
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mismatched_response_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 999,
                "result": "0x1"
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(server.uri());
        let err = client.block_number().await.unwrap_err();
        assert!(matches!(err, RpcClientError::InvalidResponse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn envelope_without_result_or_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(server.uri());
        let err = client.block_number().await.unwrap_err();
        assert!(matches!(err, RpcClientError::InvalidResponse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn null_result_is_returned_as_is() {
        let (client, _server) = mock_node(Value::Null).await;

        let tx = client
            .transaction_by_hash("0x00000000000000000000000000000000000000000000000000000000deadbeef")
            .await
            .unwrap();
        assert_eq!(tx, Value::Null);
    }

    #[tokio::test]
    async fn accounts_preserve_node_order() {
        let (client, _server) = mock_node(json!([
            "0xAAA0000000000000000000000000000000000001",
            "0xBBB0000000000000000000000000000000000002",
        ]))
        .await;

        let accounts = client.accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![
                "0xAAA0000000000000000000000000000000000001".to_string(),
                "0xBBB0000000000000000000000000000000000002".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn balance_defaults_to_latest_tag() {
        let (client, server) = mock_node(json!("0xde0b6b3a7640000")).await;

        let balance = client
            .balance("0x1111111111111111111111111111111111111111", BlockTag::default())
            .await
            .unwrap();
        assert_eq!(balance, "0xde0b6b3a7640000");

        let requests = sent_requests(&server).await;
        assert_eq!(requests[0]["method"], "eth_getBalance");
        assert_eq!(
            requests[0]["params"],
            json!(["0x1111111111111111111111111111111111111111", "latest"])
        );
    }

    #[tokio::test]
    async fn mine_serializes_block_count_as_decimal_string() {
        let (client, server) = mock_node(json!(true)).await;

        client.mine(5).await.unwrap();

        let requests = sent_requests(&server).await;
        assert_eq!(requests[0]["method"], "hardhat_mine");
        assert_eq!(requests[0]["params"], json!(["5"]));
    }

    #[tokio::test]
    async fn increase_time_advances_then_mines_one_block() {
        let (client, server) = mock_node(json!(true)).await;

        client.increase_time(3600).await.unwrap();

        let requests = sent_requests(&server).await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["method"], "evm_increaseTime");
        assert_eq!(requests[0]["params"], json!([3600]));
        assert_eq!(requests[1]["method"], "hardhat_mine");
        assert_eq!(requests[1]["params"], json!(["1"]));
    }

    #[tokio::test]
    async fn snapshot_and_revert_round_trip_the_opaque_id() {
        let (client, server) = mock_node(json!("0x2a")).await;

        let id = client.snapshot().await.unwrap();
        assert_eq!(id, "0x2a");
        client.revert(&id).await.unwrap();

        let requests = sent_requests(&server).await;
        assert_eq!(requests[1]["method"], "evm_revert");
        assert_eq!(requests[1]["params"], json!(["0x2a"]));
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_transport_error() {
        // Nothing is listening on this port.
        let client = RpcClient::new("http://127.0.0.1:9");
        let err = client.block_number().await.unwrap_err();
        assert!(matches!(err, RpcClientError::Transport(_)), "got {err:?}");
    }
}
