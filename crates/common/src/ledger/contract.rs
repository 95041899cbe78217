use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::abi::{self, ParamType, Token};
use super::rpc::{RpcClient, TransactionRequest};
use super::transaction::LegacyTransaction;
use super::{
    Address, Ledger, LedgerError, Registration, Signer, TxHash, DOCUMENT_EXISTS,
    GET_DOCUMENT_DETAILS, REGISTER_DOCUMENT,
};
use crate::content_store::ContentId;
use crate::fingerprint::Fingerprint;

/// Knobs for submitting registration transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactOptions {
    /// Signing chain id; queried from the node when `None`.
    pub chain_id: Option<u64>,
    pub gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            chain_id: None,
            gas_limit: 300_000,
            receipt_poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

/// The registry contract reached through a JSON-RPC node.
#[derive(Debug, Clone)]
pub struct ContractLedger {
    rpc: RpcClient,
    options: TransactOptions,
}

impl ContractLedger {
    pub fn new(rpc: RpcClient, options: TransactOptions) -> Self {
        Self { rpc, options }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        match self.options.chain_id {
            Some(id) => Ok(id),
            None => Ok(self.rpc.chain_id().await?),
        }
    }

    async fn submit(
        &self,
        contract: &Address,
        data: Vec<u8>,
        signer: &Signer,
    ) -> Result<TxHash, LedgerError> {
        match signer {
            Signer::LocalKey(key) => {
                let chain_id = self.chain_id().await?;
                let nonce = self.rpc.transaction_count(&key.address()).await?;
                let gas_price = self.rpc.gas_price().await?;
                let tx = LegacyTransaction {
                    nonce,
                    gas_price,
                    gas_limit: self.options.gas_limit,
                    to: *contract,
                    value: 0,
                    data,
                    chain_id,
                };
                tracing::debug!(from = %key.address(), nonce, chain_id, "signing registration");
                let raw = tx.sign(key)?;
                Ok(self.rpc.send_raw_transaction(&raw).await?)
            }
            Signer::Unlocked(from) => {
                let request = TransactionRequest {
                    from: *from,
                    to: *contract,
                    data,
                    gas: self.options.gas_limit,
                };
                Ok(self.rpc.send_transaction(&request).await?)
            }
        }
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<(), LedgerError> {
        tokio::time::timeout(self.options.receipt_timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| LedgerError::ReceiptTimeout(hash, self.options.receipt_timeout))?
    }

    async fn poll_receipt(&self, hash: TxHash) -> Result<(), LedgerError> {
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(&hash).await? {
                if !receipt.succeeded() {
                    return Err(LedgerError::Reverted(hash));
                }
                tracing::info!(tx = %hash, block = ?receipt.block_number, "registration mined");
                return Ok(());
            }
            tokio::time::sleep(self.options.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl Ledger for ContractLedger {
    async fn document_exists(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<bool, LedgerError> {
        let data = abi::encode_call(DOCUMENT_EXISTS, &[Token::String(fingerprint.to_string())]);
        let output = self.rpc.call(contract, &data).await?;
        let exists = abi::decode(&[ParamType::Bool], &output)?
            .pop()
            .and_then(Token::into_bool)
            .ok_or_else(|| LedgerError::Internal("documentExists returned no bool".into()))?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(contract = %contract, fingerprint = %fingerprint))]
    async fn document_details(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<Registration, LedgerError> {
        let data = abi::encode_call(
            GET_DOCUMENT_DETAILS,
            &[Token::String(fingerprint.to_string())],
        );
        let output = self.rpc.call(contract, &data).await?;
        let mut tokens = abi::decode(
            &[
                ParamType::Address,
                ParamType::String,
                ParamType::Uint256,
                ParamType::Bool,
            ],
            &output,
        )?
        .into_iter();

        let owner = tokens.next().and_then(Token::into_address);
        let cid = tokens.next().and_then(Token::into_string);
        let timestamp = tokens.next().and_then(Token::into_u64);
        let exists = tokens.next().and_then(Token::into_bool).unwrap_or(false);

        if !exists {
            return Ok(Registration::absent(fingerprint.clone()));
        }

        let timestamp = match timestamp {
            Some(secs) => Some(
                i64::try_from(secs)
                    .ok()
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .ok_or_else(|| LedgerError::TimestampOutOfRange(secs.to_string()))?,
            ),
            None => None,
        };

        Ok(Registration {
            fingerprint: fingerprint.clone(),
            exists,
            owner: owner.filter(|owner| !owner.is_zero()),
            cid: cid.filter(|cid| !cid.is_empty()),
            timestamp,
        })
    }

    #[tracing::instrument(skip(self, signer), fields(contract = %contract, fingerprint = %fingerprint, from = %signer.address()))]
    async fn register_document(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
        cid: &ContentId,
        signer: &Signer,
    ) -> Result<TxHash, LedgerError> {
        let data = abi::encode_call(
            REGISTER_DOCUMENT,
            &[
                Token::String(fingerprint.to_string()),
                Token::String(cid.to_string()),
            ],
        );
        let hash = self.submit(contract, data, signer).await?;
        tracing::info!(tx = %hash, "registration submitted");

        self.wait_for_receipt(hash).await?;
        Ok(hash)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        let block = self.rpc.block_number().await?;
        tracing::trace!(block, "ledger reachable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;
    use url::Url;

    use super::*;

    const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn ledger_for(server: &MockServer) -> ContractLedger {
        let rpc = RpcClient::new(
            reqwest::Client::new(),
            Url::parse(&server.base_url()).unwrap(),
        );
        ContractLedger::new(
            rpc,
            TransactOptions {
                chain_id: None,
                gas_limit: 300_000,
                receipt_poll_interval: Duration::from_millis(10),
                receipt_timeout: Duration::from_secs(2),
            },
        )
    }

    fn contract() -> Address {
        CONTRACT.parse().unwrap()
    }

    fn fingerprint() -> Fingerprint {
        "48454c4c4f57524c44".parse().unwrap()
    }

    fn rpc_result(result: serde_json::Value) -> serde_json::Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    fn tx_hash() -> String {
        format!("0x{}", "ab".repeat(32))
    }

    async fn mock_method<'a>(server: &'a MockServer, method: &str, result: serde_json::Value) -> httpmock::Mock<'a> {
        let partial = json!({ "method": method }).to_string();
        server
            .mock_async(|when, then| {
                when.method(POST).path("/").json_body_partial(partial);
                then.status(200).json_body(rpc_result(result));
            })
            .await
    }

    #[tokio::test]
    async fn test_document_exists() {
        let server = MockServer::start_async().await;
        let selector = hex::encode(abi::selector(DOCUMENT_EXISTS));
        let call = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"method":"eth_call"}"#)
                    .body_contains(format!("0x{}", selector));
                then.status(200).json_body(rpc_result(json!(format!(
                    "0x{}",
                    hex::encode(abi::encode(&[Token::Bool(true)]))
                ))));
            })
            .await;

        let exists = ledger_for(&server)
            .document_exists(&contract(), &fingerprint())
            .await
            .unwrap();

        call.assert_async().await;
        assert!(exists);
    }

    #[tokio::test]
    async fn test_document_details_for_registered_document() {
        let server = MockServer::start_async().await;
        let owner: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let output = abi::encode(&[
            Token::Address(owner),
            Token::String(CID.into()),
            Token::uint(1_700_000_000),
            Token::Bool(true),
        ]);
        mock_method(&server, "eth_call", json!(format!("0x{}", hex::encode(output)))).await;

        let registration = ledger_for(&server)
            .document_details(&contract(), &fingerprint())
            .await
            .unwrap();

        assert!(registration.exists);
        assert_eq!(registration.owner, Some(owner));
        assert_eq!(registration.cid.as_deref(), Some(CID));
        assert_eq!(
            registration.timestamp.unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[tokio::test]
    async fn test_document_details_for_unknown_document() {
        let server = MockServer::start_async().await;
        let output = abi::encode(&[
            Token::Address(Address::ZERO),
            Token::String(String::new()),
            Token::uint(0),
            Token::Bool(false),
        ]);
        mock_method(&server, "eth_call", json!(format!("0x{}", hex::encode(output)))).await;

        let registration = ledger_for(&server)
            .document_details(&contract(), &fingerprint())
            .await
            .unwrap();

        assert_eq!(registration, Registration::absent(fingerprint()));
    }

    #[tokio::test]
    async fn test_register_with_local_key_signs_and_waits() {
        let server = MockServer::start_async().await;
        let chain_id = mock_method(&server, "eth_chainId", json!("0x539")).await;
        let nonce = mock_method(&server, "eth_getTransactionCount", json!("0x0")).await;
        mock_method(&server, "eth_gasPrice", json!("0x3b9aca00")).await;
        let send = mock_method(&server, "eth_sendRawTransaction", json!(tx_hash())).await;
        let receipt = mock_method(
            &server,
            "eth_getTransactionReceipt",
            json!({"transactionHash": tx_hash(), "blockNumber": "0x1", "status": "0x1"}),
        )
        .await;

        let signer = Signer::LocalKey(HARDHAT_KEY.parse().unwrap());
        let hash = ledger_for(&server)
            .register_document(&contract(), &fingerprint(), &CID.parse().unwrap(), &signer)
            .await
            .unwrap();

        assert_eq!(hash.to_string(), tx_hash());
        chain_id.assert_async().await;
        nonce.assert_async().await;
        send.assert_async().await;
        receipt.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_through_unlocked_account() {
        let server = MockServer::start_async().await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"method":"eth_sendTransaction"}"#)
                    .body_contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
                    .body_contains("0x493e0");
                then.status(200).json_body(rpc_result(json!(tx_hash())));
            })
            .await;
        mock_method(
            &server,
            "eth_getTransactionReceipt",
            json!({"transactionHash": tx_hash(), "status": "0x1"}),
        )
        .await;

        let signer = Signer::Unlocked("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap());
        ledger_for(&server)
            .register_document(&contract(), &fingerprint(), &CID.parse().unwrap(), &signer)
            .await
            .unwrap();

        send.assert_async().await;
    }

    #[tokio::test]
    async fn test_reverted_registration_is_an_error() {
        let server = MockServer::start_async().await;
        mock_method(&server, "eth_sendTransaction", json!(tx_hash())).await;
        mock_method(
            &server,
            "eth_getTransactionReceipt",
            json!({"transactionHash": tx_hash(), "status": "0x0"}),
        )
        .await;

        let signer = Signer::Unlocked(Address::from_bytes([7; 20]));
        let err = ledger_for(&server)
            .register_document(&contract(), &fingerprint(), &CID.parse().unwrap(), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let server = MockServer::start_async().await;
        mock_method(&server, "eth_sendTransaction", json!(tx_hash())).await;
        mock_method(&server, "eth_getTransactionReceipt", json!(null)).await;

        let mut ledger = ledger_for(&server);
        ledger.options.receipt_timeout = Duration::from_millis(100);

        let signer = Signer::Unlocked(Address::from_bytes([7; 20]));
        let err = ledger
            .register_document(&contract(), &fingerprint(), &CID.parse().unwrap(), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReceiptTimeout(_, _)));
    }

    #[tokio::test]
    async fn test_ping_reads_block_number() {
        let server = MockServer::start_async().await;
        let block = mock_method(&server, "eth_blockNumber", json!("0x10")).await;
        ledger_for(&server).ping().await.unwrap();
        block.assert_async().await;
    }
}
