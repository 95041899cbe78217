use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use multihash::Multihash;
use sha2::{Digest, Sha256};

use super::{ContentId, ContentStore, ContentStoreError};

/// Multicodec code for raw binary content.
const RAW_CODEC: u64 = 0x55;
/// Multihash code for sha2-256.
const SHA2_256: u64 = 0x12;

/// In-memory content store addressing content by CIDv1 (raw, sha2-256)
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<HashMap<ContentId, Bytes>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cid_for(content: &[u8]) -> Result<ContentId, ContentStoreError> {
        let digest = Sha256::digest(content);
        let hash = Multihash::<64>::wrap(SHA2_256, &digest)
            .map_err(|e| ContentStoreError::Internal(e.to_string()))?;
        Ok(Cid::new_v1(RAW_CODEC, hash).into())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn store(&self, _name: &str, content: Bytes) -> Result<ContentId, ContentStoreError> {
        let cid = Self::cid_for(&content)?;
        let mut inner = self.inner.write().map_err(|e| {
            ContentStoreError::Internal(format!("failed to acquire write lock: {}", e))
        })?;
        inner.insert(cid, content);
        Ok(cid)
    }

    async fn retrieve(&self, cid: &ContentId) -> Result<Bytes, ContentStoreError> {
        let inner = self.inner.read().map_err(|e| {
            ContentStoreError::Internal(format!("failed to acquire read lock: {}", e))
        })?;
        inner
            .get(cid)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(cid.to_string()))
    }

    async fn ping(&self) -> Result<(), ContentStoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = MemoryContentStore::new();
        let cid = store
            .store("a.txt", Bytes::from_static(b"HELLOWRLD"))
            .await
            .unwrap();

        assert_eq!(cid.cid().codec(), RAW_CODEC);
        assert_eq!(store.retrieve(&cid).await.unwrap(), &b"HELLOWRLD"[..]);
    }

    #[tokio::test]
    async fn test_identical_content_shares_cid() {
        let store = MemoryContentStore::new();
        let a = store.store("a", Bytes::from_static(b"x")).await.unwrap();
        let b = store.store("b", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_cid_is_not_found() {
        let store = MemoryContentStore::new();
        let cid = MemoryContentStore::cid_for(b"never stored").unwrap();
        assert!(matches!(
            store.retrieve(&cid).await,
            Err(ContentStoreError::NotFound(_))
        ));
    }
}
