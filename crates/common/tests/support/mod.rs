//! Shared fakes for orchestrator integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use common::content_store::{ContentId, ContentStore, ContentStoreError, MemoryContentStore};
use common::fingerprint::{Fingerprint, FingerprintScheme};
use common::ledger::{Address, Ledger, LedgerError, MemoryLedger, Registration, Signer, TxHash};
use common::registry::DocumentService;

pub const CONTRACT: [u8; 20] = [0x5f; 20];

pub fn contract() -> Address {
    Address::from_bytes(CONTRACT)
}

pub fn signer() -> Signer {
    Signer::Unlocked(Address::from_bytes([0xf3; 20]))
}

/// Content store that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryContentStore,
    pub stores: AtomicUsize,
    pub retrievals: AtomicUsize,
    pub fail: bool,
}

impl CountingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.stores.load(Ordering::SeqCst) + self.retrievals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn store(&self, name: &str, content: Bytes) -> Result<ContentId, ContentStoreError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ContentStoreError::Unauthorized("invalid api key".into()));
        }
        self.inner.store(name, content).await
    }

    async fn retrieve(&self, cid: &ContentId) -> Result<Bytes, ContentStoreError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.inner.retrieve(cid).await
    }

    async fn ping(&self) -> Result<(), ContentStoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

/// Ledger that counts calls and can be told to reject writes.
#[derive(Debug, Default)]
pub struct CountingLedger {
    inner: MemoryLedger,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes: bool,
}

impl CountingLedger {
    pub fn rejecting_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for CountingLedger {
    async fn document_exists(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<bool, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.document_exists(contract, fingerprint).await
    }

    async fn document_details(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<Registration, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.document_details(contract, fingerprint).await
    }

    async fn register_document(
        &self,
        contract: &Address,
        fingerprint: &Fingerprint,
        cid: &ContentId,
        signer: &Signer,
    ) -> Result<TxHash, LedgerError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(LedgerError::Reverted(TxHash::from_bytes([0xee; 32])));
        }
        self.inner
            .register_document(contract, fingerprint, cid, signer)
            .await
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

pub fn service_with(
    store: Arc<CountingStore>,
    ledger: Arc<CountingLedger>,
    scheme: FingerprintScheme,
) -> DocumentService {
    DocumentService::new(store, ledger, scheme)
}

/// A service over fresh fakes, returning handles to them.
pub fn setup(scheme: FingerprintScheme) -> (DocumentService, Arc<CountingStore>, Arc<CountingLedger>) {
    let store = Arc::new(CountingStore::default());
    let ledger = Arc::new(CountingLedger::default());
    let service = service_with(store.clone(), ledger.clone(), scheme);
    (service, store, ledger)
}
