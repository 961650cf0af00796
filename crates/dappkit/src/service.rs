//! The facade coordinating transport and contract bridge

use alloy_primitives::hex;
use dappkit_contract::{AbiValue, ContractBridge, ContractError, Function, Interface};
use dappkit_rpc::{BlockTag, RpcClient, RpcClientError, TxRequest};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failures surfaced by [`ChainService`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The transport or node call failed.
    #[error(transparent)]
    Rpc(#[from] RpcClientError),
    /// Catalog parsing, encoding, or decoding failed.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Basic network identity and fee state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Chain id as a hex quantity.
    pub chain_id: String,
    /// Latest block number as a hex quantity.
    pub block_number: String,
    /// Current gas price in wei as a hex quantity.
    pub gas_price: String,
}

/// Balance, nonce, and deployed code of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Balance in wei as a hex quantity.
    pub balance: String,
    /// Transaction count as a hex quantity.
    pub nonce: String,
    /// Deployed bytecode as hex data (`0x` for externally owned accounts).
    pub code: String,
}

/// A transaction object paired with its receipt.
///
/// Either member is JSON `null` when the node does not know it (unknown
/// hash, or a transaction still pending without a receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    /// The transaction object as returned by the node.
    pub transaction: Value,
    /// The receipt object as returned by the node.
    pub receipt: Value,
}

/// ERC-20 metadata shaped for presentation.
///
/// `decimals` falls back to 18 when the contract call fails; that fallback
/// is this facade's documented policy, not a guarantee of the underlying
/// bridge, which reports the field as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// The token name, when readable.
    pub name: Option<String>,
    /// The token symbol, when readable.
    pub symbol: Option<String>,
    /// Decimal places; 18 when the call failed.
    pub decimals: u8,
    /// Total supply in base units as a decimal string, when readable.
    pub total_supply: Option<String>,
}

/// Stateless coordinator exposing the named operations consumed by UI, CLI,
/// and tool-protocol collaborators.
///
/// Owns one [`RpcClient`] (long-lived, per-instance request-id counter) and
/// one [`ContractBridge`] over it. Parallelizable sub-queries are issued
/// concurrently; the tuple order of composite results is fixed regardless of
/// completion order.
#[derive(Debug, Clone)]
pub struct ChainService {
    client: Arc<RpcClient>,
    bridge: ContractBridge,
}

impl ChainService {
    /// Creates a service over a fresh client for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Arc::new(RpcClient::new(endpoint)))
    }

    /// Creates a service over an existing client, e.g. one built with a
    /// transport-level timeout.
    pub fn with_client(client: Arc<RpcClient>) -> Self {
        let bridge = ContractBridge::new(client.clone());
        Self { client, bridge }
    }

    /// The underlying transport, for callers needing raw method access.
    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    /// Chain id, latest block number, and gas price, fetched concurrently.
    pub async fn get_network_info(&self) -> Result<NetworkInfo, ServiceError> {
        let (chain_id, block_number, gas_price) = futures::try_join!(
            self.client.chain_id(),
            self.client.block_number(),
            self.client.gas_price(),
        )?;
        Ok(NetworkInfo { chain_id, block_number, gas_price })
    }

    /// Balance, nonce, and code of an account at the latest block, fetched
    /// concurrently.
    pub async fn get_account_info(&self, address: &str) -> Result<AccountInfo, ServiceError> {
        let (balance, nonce, code) = futures::try_join!(
            self.client.balance(address, BlockTag::default()),
            self.client.transaction_count(address, BlockTag::default()),
            self.client.code(address, BlockTag::default()),
        )?;
        Ok(AccountInfo { balance, nonce, code })
    }

    /// A transaction and its receipt, fetched concurrently.
    pub async fn get_transaction_details(
        &self,
        tx_hash: &str,
    ) -> Result<TransactionDetails, ServiceError> {
        let (transaction, receipt) = futures::try_join!(
            self.client.transaction_by_hash(tx_hash),
            self.client.transaction_receipt(tx_hash),
        )?;
        Ok(TransactionDetails { transaction, receipt })
    }

    /// Raw ERC-20 balance of `account` at `token_address`, as a decimal
    /// string in base units (no decimal scaling).
    pub async fn get_token_balance(
        &self,
        token_address: &str,
        account: &str,
    ) -> Result<String, ServiceError> {
        let balance = self.bridge.token_balance(token_address, account).await?;
        Ok(balance.to_string())
    }

    /// ERC-20 metadata, leniently loaded per field, with this facade's
    /// `decimals`-defaults-to-18 presentation policy applied.
    pub async fn get_token_metadata(
        &self,
        token_address: &str,
    ) -> Result<TokenInfo, ServiceError> {
        let metadata = self.bridge.token_metadata(token_address).await?;
        Ok(TokenInfo {
            name: metadata.name,
            symbol: metadata.symbol,
            decimals: metadata.decimals.unwrap_or(18),
            total_supply: metadata.total_supply.map(|supply| supply.to_string()),
        })
    }

    /// Estimated gas for a prospective transaction, as a hex quantity.
    pub async fn estimate_gas(&self, tx: &TxRequest) -> Result<String, ServiceError> {
        Ok(self.client.estimate_gas(tx).await?)
    }

    /// Calls a read-only contract function with JSON parameters, returning
    /// the decoded values as JSON (quantities as decimal strings, addresses
    /// checksummed).
    pub async fn call_function<S: AsRef<str>>(
        &self,
        contract_address: &str,
        catalog: &[S],
        function_name: &str,
        params: &[Value],
    ) -> Result<Vec<Value>, ServiceError> {
        let interface = Interface::parse(catalog)?;
        let args = coerce_params(interface.function(function_name)?, params)?;
        debug!("call_function {} on {}", function_name, contract_address);
        let values =
            self.bridge.call_function(contract_address, &interface, function_name, &args).await?;
        Ok(values.iter().map(AbiValue::to_json).collect())
    }

    /// Encodes calldata for a catalog function without a network round trip,
    /// as `0x`-prefixed hex.
    pub fn encode_call<S: AsRef<str>>(
        &self,
        catalog: &[S],
        function_name: &str,
        params: &[Value],
    ) -> Result<String, ServiceError> {
        let interface = Interface::parse(catalog)?;
        let args = coerce_params(interface.function(function_name)?, params)?;
        let data = self.bridge.encode_call(&interface, function_name, &args)?;
        Ok(format!("0x{}", hex::encode(data)))
    }

    /// Decodes `0x`-prefixed return data against a catalog function's
    /// declared return types, as JSON values.
    pub fn decode_result<S: AsRef<str>>(
        &self,
        catalog: &[S],
        function_name: &str,
        data: &str,
    ) -> Result<Vec<Value>, ServiceError> {
        let interface = Interface::parse(catalog)?;
        let stripped = data.strip_prefix("0x").unwrap_or(data);
        let bytes = hex::decode(stripped)
            .map_err(|e| ContractError::Decode(format!("malformed hex data: {e}")))?;
        let values = self.bridge.decode_result(&interface, function_name, &bytes)?;
        Ok(values.iter().map(AbiValue::to_json).collect())
    }

    /// A block object by number or tag (`"latest"`, `"pending"`, a hex
    /// quantity), without full transaction bodies.
    pub async fn get_block_info(&self, block: &str) -> Result<Value, ServiceError> {
        Ok(self.client.block_by_number(BlockTag::from(block), false).await?)
    }

    /// The node-managed accounts, in node order.
    pub async fn get_accounts(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.client.accounts().await?)
    }

    // -- Test-node utilities ------------------------------------------------

    /// Impersonates an address on a development node.
    pub async fn impersonate(&self, address: &str) -> Result<(), ServiceError> {
        Ok(self.client.impersonate_account(address).await?)
    }

    /// Force-sets an account balance (hex quantity) on a development node.
    pub async fn set_balance(&self, address: &str, balance: &str) -> Result<(), ServiceError> {
        Ok(self.client.set_balance(address, balance).await?)
    }

    /// Mines `count` blocks on a development node.
    pub async fn mine_blocks(&self, count: u64) -> Result<(), ServiceError> {
        Ok(self.client.mine(count).await?)
    }

    /// Advances chain time by `seconds` and mines one block.
    pub async fn increase_time(&self, seconds: u64) -> Result<(), ServiceError> {
        Ok(self.client.increase_time(seconds).await?)
    }

    /// Snapshots chain state, returning an opaque snapshot id.
    pub async fn create_snapshot(&self) -> Result<String, ServiceError> {
        Ok(self.client.snapshot().await?)
    }

    /// Reverts chain state to a previously created snapshot.
    pub async fn revert_snapshot(&self, snapshot_id: &str) -> Result<(), ServiceError> {
        Ok(self.client.revert(snapshot_id).await?)
    }
}

fn coerce_params(function: &Function, params: &[Value]) -> Result<Vec<AbiValue>, ContractError> {
    if params.len() != function.inputs.len() {
        return Err(ContractError::Encode(format!(
            "{} takes {} parameters, got {}",
            function.signature(),
            function.inputs.len(),
            params.len()
        )));
    }
    function
        .inputs
        .iter()
        .zip(params)
        .map(|(ty, value)| AbiValue::from_json(ty, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const TOKEN: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

    /// Simulates a development node: answers each JSON-RPC method with a
    /// canned result, echoing the request id.
    struct NodeSim;

    impl Respond for NodeSim {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let data = body["params"][0]["data"].as_str().unwrap_or("");
            let result = match body["method"].as_str().unwrap() {
                "eth_chainId" => json!("0x7a69"),
                "eth_blockNumber" => json!("0x10"),
                "eth_gasPrice" => json!("0x3b9aca00"),
                "eth_getBalance" => json!("0xde0b6b3a7640000"),
                "eth_getTransactionCount" => json!("0x5"),
                "eth_getCode" => json!("0x"),
                "eth_accounts" => json!([
                    "0xAAA0000000000000000000000000000000000001",
                    "0xBBB0000000000000000000000000000000000002",
                ]),
                "eth_call" if data.starts_with("0x70a08231") => {
                    // balanceOf -> 1 ether in base units
                    json!("0x0000000000000000000000000000000000000000000000000de0b6b3a7640000")
                }
                "eth_call" if data.starts_with("0x06fdde03") => json!(
                    "0x0000000000000000000000000000000000000000000000000000000000000020\
                     000000000000000000000000000000000000000000000000000000000000000a\
                     5465737420546f6b656e00000000000000000000000000000000000000000000"
                ),
                "eth_call" if data.starts_with("0x95d89b41") => json!(
                    "0x0000000000000000000000000000000000000000000000000000000000000020\
                     0000000000000000000000000000000000000000000000000000000000000002\
                     5454000000000000000000000000000000000000000000000000000000000000"
                ),
                "eth_call" if data.starts_with("0x18160ddd") => {
                    json!("0x00000000000000000000000000000000000000000000d3c21bcecceda1000000")
                }
                "eth_call" if data.starts_with("0x313ce567") => {
                    // decimals() reverts on this token
                    return ResponseTemplate::new(200).set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": body["id"],
                        "error": { "code": -32000, "message": "execution reverted" }
                    }));
                }
                _ => json!(true),
            };
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        }
    }

    async fn service() -> (ChainService, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/")).respond_with(NodeSim).mount(&server).await;
        (ChainService::new(server.uri()), server)
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
    async fn network_info_composes_three_queries() {
        let (service, _server) = service().await;
        let info = service.get_network_info().await.unwrap();
        assert_eq!(
            info,
            NetworkInfo {
                chain_id: "0x7a69".to_string(),
                block_number: "0x10".to_string(),
                gas_price: "0x3b9aca00".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn account_info_composes_three_queries() {
        let (service, _server) = service().await;
        let info = service
            .get_account_info("0x1111111111111111111111111111111111111111")
            .await
            .unwrap();
        assert_eq!(
            info,
            AccountInfo {
                balance: "0xde0b6b3a7640000".to_string(),
                nonce: "0x5".to_string(),
                code: "0x".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn accounts_come_back_in_node_order() {
        let (service, _server) = service().await;
        let accounts = service.get_accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![
                "0xAAA0000000000000000000000000000000000001".to_string(),
                "0xBBB0000000000000000000000000000000000002".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn token_balance_is_a_decimal_string() {
        let (service, _server) = service().await;
        let balance = service
            .get_token_balance(TOKEN, "0x1111111111111111111111111111111111111111")
            .await
            .unwrap();
        assert_eq!(balance, "1000000000000000000");
    }

    #[tokio::test]
    async fn token_metadata_applies_decimals_fallback() {
        let (service, _server) = service().await;
        let info = service.get_token_metadata(TOKEN).await.unwrap();
        assert_eq!(info.name.as_deref(), Some("Test Token"));
        assert_eq!(info.symbol.as_deref(), Some("TT"));
        // decimals() reverted; the facade presents the documented default.
        assert_eq!(info.decimals, 18);
        assert_eq!(info.total_supply.as_deref(), Some("1000000000000000000000000"));
    }

    #[tokio::test]
    async fn call_function_speaks_json_on_both_sides() {
        let (service, _server) = service().await;
        let catalog = ["function balanceOf(address owner) view returns (uint256)"];
        let out = service
            .call_function(
                TOKEN,
                &catalog,
                "balanceOf",
                &[json!("0x1111111111111111111111111111111111111111")],
            )
            .await
            .unwrap();
        assert_eq!(out, vec![json!("1000000000000000000")]);
    }

    #[tokio::test]
    async fn unknown_function_issues_no_network_calls() {
        let (service, server) = service().await;
        let catalog = ["function balanceOf(address) view returns (uint256)"];
        let err =
            service.call_function(TOKEN, &catalog, "mint", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Contract(ContractError::UnknownFunction { .. })
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn encode_and_decode_without_network() {
        let (service, server) = service().await;
        let catalog = ["function transfer(address to, uint256 amount) returns (bool)"];

        let data = service
            .encode_call(
                &catalog,
                "transfer",
                &[
                    json!("0x1111111111111111111111111111111111111111"),
                    json!("1000000000000000000"),
                ],
            )
            .unwrap();
        assert_eq!(
            data,
            "0xa9059cbb\
             0000000000000000000000001111111111111111111111111111111111111111\
             0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );

        let decoded = service
            .decode_result(
                &catalog,
                "transfer",
                "0x0000000000000000000000000000000000000000000000000000000000000001",
            )
            .unwrap();
        assert_eq!(decoded, vec![json!(true)]);

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn increase_time_advances_then_mines() {
        let (service, server) = service().await;
        service.increase_time(600).await.unwrap();

        let requests = sent_requests(&server).await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["method"], "evm_increaseTime");
        assert_eq!(requests[1]["method"], "hardhat_mine");
        assert_eq!(requests[1]["params"], json!(["1"]));
    }

    #[tokio::test]
    async fn snapshot_then_revert_round_trips_the_id() {
        let server = MockServer::start().await;
        struct SnapshotSim;
        impl Respond for SnapshotSim {
            fn respond(&self, request: &Request) -> ResponseTemplate {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                let result = match body["method"].as_str().unwrap() {
                    "evm_snapshot" => json!("0x2a"),
                    _ => json!(true),
                };
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "result": result,
                }))
            }
        }
        Mock::given(method("POST")).and(path("/")).respond_with(SnapshotSim).mount(&server).await;

        let service = ChainService::new(server.uri());
        let id = service.create_snapshot().await.unwrap();
        assert_eq!(id, "0x2a");
        service.revert_snapshot(&id).await.unwrap();

        let requests = sent_requests(&server).await;
        assert_eq!(requests[1]["method"], "evm_revert");
        assert_eq!(requests[1]["params"], json!(["0x2a"]));
    }
}
