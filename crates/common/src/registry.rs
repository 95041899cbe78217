use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content_store::{ContentId, ContentStoreError, DynContentStore};
use crate::encryption::{self, EncryptionError, Password};
use crate::fingerprint::{Fingerprint, FingerprintError, FingerprintScheme};
use crate::ledger::{Address, DynLedger, Signer, TxHash};

/// A named blob submitted for registration.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub content: Bytes,
    /// Seal the content under this password before it leaves the process
    pub password: Option<Password>,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: Password) -> Self {
        self.password = Some(password);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Outcome of an upload. `success` means the document reached the content
///  store; a failed ledger write is reported in `registration_error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    /// The document fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<ContentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Plaintext size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// The stored bytes are password sealed; the fingerprint is still
    ///  over the plaintext.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Stored and registered.
    pub fn is_registered(&self) -> bool {
        self.success && self.tx_hash.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(rename = "ipfsCID", default, skip_serializing_if = "Option::is_none")]
    pub ipfs_cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            exists: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Ties a content store and a ledger together into the upload and
///  verification flows.
#[derive(Debug, Clone)]
pub struct DocumentService {
    store: DynContentStore,
    ledger: DynLedger,
    scheme: FingerprintScheme,
}

impl DocumentService {
    pub fn new(store: DynContentStore, ledger: DynLedger, scheme: FingerprintScheme) -> Self {
        Self {
            store,
            ledger,
            scheme,
        }
    }

    pub fn scheme(&self) -> FingerprintScheme {
        self.scheme
    }

    pub fn store(&self) -> &DynContentStore {
        &self.store
    }

    pub fn ledger(&self) -> &DynLedger {
        &self.ledger
    }

    pub fn fingerprint(&self, content: &[u8]) -> Result<Fingerprint, FingerprintError> {
        self.scheme.fingerprint(content)
    }

    /// Store the document, then register its fingerprint and CID.
    ///
    /// Nothing touches the network for an empty document. A content store
    ///  failure ends the flow before any ledger write is attempted. With a
    ///  password the store only ever sees the sealed bytes, while the
    ///  fingerprint stays over the plaintext so verification is unchanged.
    #[tracing::instrument(
        skip(self, document, signer),
        fields(name = %document.name, size = document.content.len(), encrypted = document.password.is_some())
    )]
    pub async fn upload(
        &self,
        document: Document,
        contract: &Address,
        signer: &Signer,
    ) -> UploadResult {
        if document.content.is_empty() {
            return UploadResult::failed(FingerprintError::EmptyDocument);
        }
        let size = document.content.len() as u64;

        let stored = match &document.password {
            Some(password) => match encryption::seal(&document.content, password) {
                Ok(sealed) => Bytes::from(sealed),
                Err(e) => return UploadResult::failed(e),
            },
            None => document.content.clone(),
        };

        let cid = match self.store.store(&document.name, stored).await {
            Ok(cid) => cid,
            Err(e) => {
                tracing::error!(backend = self.store.backend(), "failed to store document: {}", e);
                return UploadResult::failed(e);
            }
        };
        tracing::info!(%cid, backend = self.store.backend(), "document stored");

        let fingerprint = match self.scheme.fingerprint(&document.content) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return UploadResult::failed(e),
        };

        let (tx_hash, registration_error) = match self
            .ledger
            .register_document(contract, &fingerprint, &cid, signer)
            .await
        {
            Ok(hash) => {
                tracing::info!(%fingerprint, tx = %hash, "document registered");
                (Some(hash), None)
            }
            Err(e) => {
                tracing::warn!(%fingerprint, %cid, "document stored but not registered: {}", e);
                (None, Some(e.to_string()))
            }
        };

        UploadResult {
            success: true,
            hash: Some(fingerprint),
            cid: Some(cid),
            tx_hash,
            registration_error,
            encrypted: document.password.is_some(),
            file_name: Some(document.name),
            size: Some(size),
            error: None,
        }
    }

    /// Look a fingerprint up on the ledger. An unknown fingerprint is a
    ///  successful lookup with `exists == false`.
    #[tracing::instrument(skip(self))]
    pub async fn verify(&self, fingerprint: &str, contract: &Address) -> VerificationResult {
        let fingerprint: Fingerprint = match fingerprint.parse() {
            Ok(fingerprint) => fingerprint,
            Err(e) => return VerificationResult::failed(e),
        };

        match self.ledger.document_details(contract, &fingerprint).await {
            Ok(registration) => VerificationResult {
                success: true,
                exists: registration.exists,
                owner: registration.owner,
                ipfs_cid: registration.cid,
                timestamp: registration.timestamp,
                error: None,
            },
            Err(e) => {
                tracing::error!(%fingerprint, "ledger lookup failed: {}", e);
                VerificationResult::failed(e)
            }
        }
    }

    /// Fetch a stored document. With a password the content is opened,
    ///  without one the stored bytes come back as they are.
    pub async fn retrieve(
        &self,
        cid: &ContentId,
        password: Option<&Password>,
    ) -> Result<Bytes, RetrievalError> {
        let content = self.store.retrieve(cid).await?;
        match password {
            Some(password) => Ok(Bytes::from(encryption::open(&content, password)?)),
            None => Ok(content),
        }
    }
}
