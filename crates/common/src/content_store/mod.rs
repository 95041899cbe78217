use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use url::Url;

mod kubo;
mod memory;
mod pinata;

pub use kubo::{KuboStore, Retrieval};
pub use memory::MemoryContentStore;
pub use pinata::{PinataCredentials, PinataStore};

/// Content identifier handed back by a content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct ContentId(cid::Cid);

impl ContentId {
    pub fn cid(&self) -> &cid::Cid {
        &self.0
    }
}

impl From<cid::Cid> for ContentId {
    fn from(cid: cid::Cid) -> Self {
        Self(cid)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = ContentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        cid::Cid::try_from(s.trim())
            .map(ContentId)
            .map_err(|e| ContentStoreError::InvalidCid(format!("{}: {}", s, e)))
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync + fmt::Debug {
    /// Store the bytes, returning the identifier they can be retrieved by.
    ///  `name` is advisory metadata (a filename) and does not affect the CID.
    async fn store(&self, name: &str, content: Bytes) -> Result<ContentId, ContentStoreError>;

    async fn retrieve(&self, cid: &ContentId) -> Result<Bytes, ContentStoreError>;

    /// Cheap reachability / credential check used by the readiness check.
    async fn ping(&self) -> Result<(), ContentStoreError>;

    /// Short name of the backend for logs and status output.
    fn backend(&self) -> &'static str;
}

pub type DynContentStore = Arc<dyn ContentStore>;

#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content store rejected credentials: {0}")]
    Unauthorized(String),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("invalid CID: {0}")]
    InvalidCid(String),
    #[error("unexpected response from content store: {0}")]
    InvalidResponse(String),
    #[error("missing content store credentials: {0}")]
    MissingCredentials(String),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("content store error: {0}")]
    Internal(String),
}

fn default_pinata_api_url() -> Url {
    Url::parse("https://api.pinata.cloud").expect("static URL")
}

fn default_pinata_gateway_url() -> Url {
    Url::parse("https://gateway.pinata.cloud").expect("static URL")
}

fn default_kubo_api_url() -> Url {
    Url::parse("http://localhost:5001").expect("static URL")
}

fn default_kubo_gateway_url() -> Url {
    Url::parse("http://localhost:8080").expect("static URL")
}

/// Which content store backend the service talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentStoreConfig {
    /// Hosted pinning service. Credentials are never read from
    ///  the config file, see [`PinataCredentials`].
    Pinata {
        #[serde(default = "default_pinata_api_url")]
        api_url: Url,
        #[serde(default = "default_pinata_gateway_url")]
        gateway_url: Url,
    },
    /// A local kubo node, falling back to its HTTP gateway
    ///  for retrieval when the API is unreachable at startup.
    Local {
        #[serde(default = "default_kubo_api_url")]
        api_url: Url,
        #[serde(default = "default_kubo_gateway_url")]
        gateway_url: Url,
    },
    /// Process-local store, contents are lost on restart.
    Memory,
}

impl ContentStoreConfig {
    /// The pinning service at its public endpoints.
    pub fn pinata() -> Self {
        ContentStoreConfig::Pinata {
            api_url: default_pinata_api_url(),
            gateway_url: default_pinata_gateway_url(),
        }
    }

    /// A kubo node on its default local ports.
    pub fn local() -> Self {
        ContentStoreConfig::Local {
            api_url: default_kubo_api_url(),
            gateway_url: default_kubo_gateway_url(),
        }
    }

    /// Override the endpoints of a networked backend. The memory store
    ///  has none and is returned unchanged.
    pub fn with_urls(mut self, api: Option<Url>, gateway: Option<Url>) -> Self {
        match &mut self {
            ContentStoreConfig::Pinata {
                api_url,
                gateway_url,
            }
            | ContentStoreConfig::Local {
                api_url,
                gateway_url,
            } => {
                if let Some(api) = api {
                    *api_url = api;
                }
                if let Some(gateway) = gateway {
                    *gateway_url = gateway;
                }
            }
            ContentStoreConfig::Memory => {}
        }
        self
    }
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// Build the content store described by `config`.
///
/// Fails fast when the pinning service is selected without credentials.
pub async fn connect(
    config: &ContentStoreConfig,
    credentials: Option<PinataCredentials>,
    client: reqwest::Client,
) -> Result<DynContentStore, ContentStoreError> {
    match config {
        ContentStoreConfig::Pinata {
            api_url,
            gateway_url,
        } => {
            let credentials = credentials.ok_or_else(|| {
                ContentStoreError::MissingCredentials(
                    "pinata api key and secret are required".to_string(),
                )
            })?;
            credentials.validate()?;
            tracing::info!(api = %api_url, gateway = %gateway_url, "using pinata content store");
            Ok(Arc::new(PinataStore::new(
                client,
                api_url.clone(),
                gateway_url.clone(),
                credentials,
            )))
        }
        ContentStoreConfig::Local {
            api_url,
            gateway_url,
        } => {
            let node = KuboStore::new(client, api_url.clone(), Retrieval::Node);
            match node.ping().await {
                Ok(()) => {
                    tracing::info!(api = %api_url, "using local ipfs node");
                    Ok(Arc::new(node))
                }
                Err(e) => {
                    tracing::warn!(
                        api = %api_url,
                        gateway = %gateway_url,
                        "local ipfs node unreachable ({}), retrieving through gateway",
                        e
                    );
                    Ok(Arc::new(
                        node.with_retrieval(Retrieval::Gateway(gateway_url.clone())),
                    ))
                }
            }
        }
        ContentStoreConfig::Memory => {
            tracing::warn!("using in-memory content store, documents will not persist");
            Ok(Arc::new(MemoryContentStore::new()))
        }
    }
}

/// Join `path` onto `base`, keeping any path prefix `base` already carries.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// Map a non-success response into a typed error.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, ContentStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ContentStoreError::Unauthorized(body))
        }
        StatusCode::NOT_FOUND => Err(ContentStoreError::NotFound(what.to_string())),
        _ => Err(ContentStoreError::HttpStatus(status, body)),
    }
}
