use common::content_store::{self, ContentStoreError};
use common::ledger::{self, Address, LedgerError, Signer};
use common::registry::DocumentService;

use super::service_config::Config;

/// Main service state, cloned into every request handler
#[derive(Debug, Clone)]
pub struct State {
    documents: DocumentService,
    contract: Address,
    signer: Option<Signer>,
}

impl State {
    pub fn new(documents: DocumentService, contract: Address, signer: Option<Signer>) -> Self {
        Self {
            documents,
            contract,
            signer,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Contract address: flag / env wins over config.toml
        let contract = config
            .contract_address
            .or(config.ledger.contract_address)
            .ok_or(StateSetupError::MissingContractAddress)?;
        if contract.is_zero() {
            return Err(StateSetupError::MissingContractAddress);
        }

        // 2. Signer, unless we only serve reads
        let signer = if config.read_only {
            tracing::info!("read-only mode, uploads are disabled");
            None
        } else if let Some(key) = &config.signing_key {
            Some(Signer::LocalKey(key.clone()))
        } else if let Some(account) = config.ledger.unlocked_account {
            Some(Signer::Unlocked(account))
        } else {
            return Err(StateSetupError::MissingSigner);
        };
        if let Some(signer) = &signer {
            tracing::info!(account = %signer.address(), "registrations will be signed by");
        }

        // 3. One pooled HTTP client shared by the store and the ledger
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        // 4. Content store
        let store = content_store::connect(
            &config.content_store,
            config.pinata_credentials.clone(),
            client.clone(),
        )
        .await?;

        // 5. Ledger
        let ledger = ledger::connect(&config.ledger, config.infura_project_id.as_deref(), client)?;
        tracing::info!(%contract, "using registry contract");

        let documents = DocumentService::new(store, ledger, config.fingerprint_scheme);
        Ok(Self::new(documents, contract, signer))
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    /// Default registry contract
    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.signer.is_none()
    }

    /// The contract a request targets: its own override, or the default.
    pub fn resolve_contract(&self, requested: Option<&str>) -> Result<Address, LedgerError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(address) => address.parse(),
            None => Ok(self.contract),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("no registry contract address configured (set ledger.contract_address or DOCVERIFY_CONTRACT_ADDRESS)")]
    MissingContractAddress,
    #[error("no signer configured (set DOCVERIFY_SIGNING_KEY, ledger.unlocked_account, or run with --read-only)")]
    MissingSigner,
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("content store setup failed: {0}")]
    ContentStore(#[from] ContentStoreError),
    #[error("ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),
}
