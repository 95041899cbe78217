use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use super::{keccak256, Address, Ledger, LedgerError, Registration, Signer, TxHash};
use crate::content_store::ContentId;
use crate::fingerprint::Fingerprint;

#[derive(Debug, Default)]
struct Inner {
    registrations: HashMap<(Address, Fingerprint), Registration>,
    transactions: u64,
}

/// In-memory registry with the same first-writer-wins rule as the contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accepted registrations across all contracts.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.registrations.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Registration>, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| LedgerError::Internal(format!("failed to acquire read lock: {}", e)))?;
        Ok(inner
            .registrations
            .get(&(*contract, fingerprint.clone()))
            .cloned())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn document_exists(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<bool, LedgerError> {
        Ok(self.lookup(contract, fingerprint)?.is_some())
    }

    async fn document_details(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<Registration, LedgerError> {
        Ok(self
            .lookup(contract, fingerprint)?
            .unwrap_or_else(|| Registration::absent(fingerprint.clone())))
    }

    async fn register_document(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
        cid: &ContentId,
        signer: &Signer,
    ) -> Result<TxHash, LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| LedgerError::Internal(format!("failed to acquire write lock: {}", e)))?;

        let key = (*contract, fingerprint.clone());
        if inner.registrations.contains_key(&key) {
            return Err(LedgerError::AlreadyRegistered(fingerprint.clone()));
        }

        inner.transactions += 1;
        let mut preimage = contract.as_bytes().to_vec();
        preimage.extend_from_slice(fingerprint.as_str().as_bytes());
        preimage.extend_from_slice(&inner.transactions.to_be_bytes());
        let hash = TxHash::from_bytes(keccak256(&preimage));

        let timestamp: DateTime<Utc> = Utc::now().trunc_subsecs(0);
        inner.registrations.insert(
            key,
            Registration {
                fingerprint: fingerprint.clone(),
                exists: true,
                owner: Some(signer.address()),
                cid: Some(cid.to_string()),
                timestamp: Some(timestamp),
            },
        );

        Ok(hash)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}
