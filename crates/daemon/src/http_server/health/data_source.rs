use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use common::registry::DocumentService;

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Check that every upstream the daemon depends on answers.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("{0} is not available")]
    DependencyFailure(&'static str),
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Pings the content store, then the ledger node.
struct UpstreamSource {
    documents: DocumentService,
}

#[async_trait]
impl DataSource for UpstreamSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        let store = self.documents.store();
        if let Err(e) = store.ping().await {
            tracing::warn!(backend = store.backend(), "content store ping failed: {}", e);
            return Err(DataSourceError::DependencyFailure("content store"));
        }
        if let Err(e) = self.documents.ledger().ping().await {
            tracing::warn!("ledger ping failed: {}", e);
            return Err(DataSourceError::DependencyFailure("ledger"));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(UpstreamSource {
            documents: state.documents().clone(),
        })))
    }
}
