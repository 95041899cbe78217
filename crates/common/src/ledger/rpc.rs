use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::{Address, TxHash};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("node returned error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// Parameters for `eth_sendTransaction` on a node holding the account.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "serialize_data")]
    pub data: Vec<u8>,
    #[serde(serialize_with = "serialize_quantity")]
    pub gas: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` when reverted. Absent before Byzantium.
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => parse_quantity(status).map(|s| s == 1).unwrap_or(false),
            None => true,
        }
    }
}

/// Ethereum JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: Url,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issue a single call. A `null` result deserializes into `R`
    ///  as-is, so methods that may return nothing should use `Option<_>`.
    #[tracing::instrument(skip(self, params), fields(id))]
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::Span::current().record("id", id);

        let body = Request {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self.client.post(self.url.clone()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RpcError::HttpStatus(status, text));
        }

        let response: Response = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        if let Some(error) = response.error {
            tracing::debug!(code = error.code, message = %error.message, "rpc call failed");
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", method, e)))
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let value: String = self.request("eth_chainId", json!([])).await?;
        quantity_u64(&value)
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let value: String = self.request("eth_blockNumber", json!([])).await?;
        quantity_u64(&value)
    }

    pub async fn gas_price(&self) -> Result<u128, RpcError> {
        let value: String = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&value)
    }

    /// Nonce for the next transaction from `address`, counting pending ones.
    pub async fn transaction_count(&self, address: &Address) -> Result<u64, RpcError> {
        let value: String = self
            .request("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        quantity_u64(&value)
    }

    /// Read-only contract call against the latest block.
    pub async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let value: String = self
            .request(
                "eth_call",
                json!([{ "to": to, "data": encode_data(data) }, "latest"]),
            )
            .await?;
        decode_data(&value)
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, RpcError> {
        self.request("eth_sendRawTransaction", json!([encode_data(raw)]))
            .await
    }

    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, RpcError> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    pub async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

pub fn encode_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

pub fn parse_quantity(value: &str) -> Result<u128, RpcError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidResponse(format!("quantity without 0x: {}", value)))?;
    if digits.is_empty() {
        return Err(RpcError::InvalidResponse("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", value, e)))
}

fn quantity_u64(value: &str) -> Result<u64, RpcError> {
    let parsed = parse_quantity(value)?;
    u64::try_from(parsed).map_err(|_| RpcError::InvalidResponse(format!("{} overflows u64", value)))
}

pub fn encode_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn decode_data(value: &str) -> Result<Vec<u8>, RpcError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| RpcError::InvalidResponse(format!("{}: {}", value, e)))
}

fn serialize_data<S: serde::Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_data(data))
}

fn serialize_quantity<S: serde::Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_quantity(*value as u128))
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn client_for(server: &MockServer) -> RpcClient {
        RpcClient::new(Client::new(), Url::parse(&server.base_url()).unwrap())
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x539").unwrap(), 1337);
        assert!(parse_quantity("539").is_err());
        assert!(parse_quantity("0x").is_err());
        assert_eq!(encode_quantity(1337), "0x539");
        assert_eq!(encode_quantity(0), "0x0");
    }

    #[tokio::test]
    async fn test_chain_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"jsonrpc":"2.0","method":"eth_chainId"}"#);
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x539"}));
            })
            .await;

        assert_eq!(client_for(&server).chain_id().await.unwrap(), 1337);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_node_error_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32000, "message": "execution reverted"}
                }));
            })
            .await;

        let err = client_for(&server).block_number().await.unwrap_err();
        assert!(matches!(err, RpcError::Node { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_http_failure_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = client_for(&server).gas_price().await.unwrap_err();
        assert!(matches!(err, RpcError::HttpStatus(status, _) if status.as_u16() == 502));
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"method":"eth_getTransactionReceipt"}"#);
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
            })
            .await;

        let receipt = client_for(&server)
            .transaction_receipt(&TxHash::from_bytes([1; 32]))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_eth_call_sends_latest_block_tag() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"method":"eth_call"}"#)
                    .body_contains("0x5FbDB2315678afecb367f032d93F642f64180aa3")
                    .body_contains("0xdeadbeef")
                    .body_contains("\"latest\"");
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x01"}));
            })
            .await;

        let to: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let out = client_for(&server)
            .call(&to, &[0xde, 0xad, 0xbe, 0xef])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn test_receipt_status() {
        let ok: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x2",
            "status": "0x1"
        }))
        .unwrap();
        assert!(ok.succeeded());

        let reverted: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x0"
        }))
        .unwrap();
        assert!(!reverted.succeeded());
    }
}
