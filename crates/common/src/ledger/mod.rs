use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha3::{Digest, Keccak256};
use url::Url;

pub mod abi;
mod contract;
mod memory;
pub mod rpc;
mod signer;
pub mod transaction;

pub use contract::{ContractLedger, TransactOptions};
pub use memory::MemoryLedger;
pub use rpc::{RpcClient, RpcError};
pub use signer::{LocalKey, Signer};
pub use transaction::TransactionError;

use crate::content_store::ContentId;
use crate::fingerprint::Fingerprint;

/// `view` function: `documentExists(string) returns (bool)`
pub const DOCUMENT_EXISTS: &str = "documentExists(string)";
/// `view` function: `getDocumentDetails(string) returns (address, string, uint256, bool)`
pub const GET_DOCUMENT_DETAILS: &str = "getDocumentDetails(string)";
/// `registerDocument(string documentHash, string ipfsCID)`
pub const REGISTER_DOCUMENT: &str = "registerDocument(string,string)";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 40 {
            return Err(LedgerError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| LedgerError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// Hash of a submitted transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| LedgerError::InvalidTxHash(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// What the registry contract knows about a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub fingerprint: Fingerprint,
    pub exists: bool,
    pub owner: Option<Address>,
    /// CID as recorded on chain. Left as a plain string since
    ///  other clients may have registered arbitrary values.
    pub cid: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn absent(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            exists: false,
            owner: None,
            cid: None,
            timestamp: None,
        }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync + fmt::Debug {
    async fn document_exists(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<bool, LedgerError>;

    /// Look up a registration. An unknown fingerprint is not an error,
    ///  it yields a [`Registration`] with `exists == false`.
    async fn document_details(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<Registration, LedgerError>;

    /// Submit `registerDocument` and wait for it to be mined.
    async fn register_document(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
        cid: &ContentId,
        signer: &Signer,
    ) -> Result<TxHash, LedgerError>;

    async fn ping(&self) -> Result<(), LedgerError>;
}

pub type DynLedger = Arc<dyn Ledger>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
    #[error("abi error: {0}")]
    Abi(#[from] abi::AbiError),
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("transaction {0} not mined within {1:?}")]
    ReceiptTimeout(TxHash, Duration),
    #[error("document already registered: {0}")]
    AlreadyRegistered(Fingerprint),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),
    #[error("registration timestamp out of range: {0}")]
    TimestampOutOfRange(String),
    #[error("missing ledger credentials: {0}")]
    MissingCredentials(String),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("ledger error: {0}")]
    Internal(String),
}

fn default_local_rpc_url() -> Url {
    Url::parse("http://localhost:8545").expect("static URL")
}

/// JSON-RPC endpoint the ledger client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcEndpoint {
    /// Any node reachable by URL (a local dev chain by default).
    Local {
        #[serde(default = "default_local_rpc_url")]
        url: Url,
    },
    /// Hosted Infura endpoint; the project id comes from the environment.
    Infura { network: String },
}

impl Default for RpcEndpoint {
    fn default() -> Self {
        RpcEndpoint::Local {
            url: default_local_rpc_url(),
        }
    }
}

impl RpcEndpoint {
    pub fn resolve(&self, infura_project_id: Option<&str>) -> Result<Url, LedgerError> {
        match self {
            RpcEndpoint::Local { url } => Ok(url.clone()),
            RpcEndpoint::Infura { network } => {
                let project_id = infura_project_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        LedgerError::MissingCredentials("infura project id is required".into())
                    })?;
                Ok(Url::parse(&format!(
                    "https://{}.infura.io/v3/{}",
                    network, project_id
                ))?)
            }
        }
    }
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

/// Ledger section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub endpoint: RpcEndpoint,
    /// Address of the deployed registry contract. Required to run the
    ///  service; may be supplied from the environment instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// Chain id used for EIP-155 signing. Queried from the node when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// Account unlocked on the node, used when no signing key is provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_account: Option<Address>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: RpcEndpoint::default(),
            contract_address: None,
            chain_id: None,
            gas_limit: default_gas_limit(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            unlocked_account: None,
        }
    }
}

impl LedgerConfig {
    pub fn transact_options(&self) -> TransactOptions {
        TransactOptions {
            chain_id: self.chain_id,
            gas_limit: self.gas_limit,
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        }
    }
}

/// Build the RPC-backed ledger described by `config`.
pub fn connect(
    config: &LedgerConfig,
    infura_project_id: Option<&str>,
    client: reqwest::Client,
) -> Result<DynLedger, LedgerError> {
    let url = config.endpoint.resolve(infura_project_id)?;
    tracing::info!(host = ?url.host_str(), "using json-rpc ledger endpoint");
    let rpc = RpcClient::new(client, url);
    Ok(Arc::new(ContractLedger::new(rpc, config.transact_options())))
}
