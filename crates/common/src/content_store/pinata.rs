use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{endpoint, error_for_status, ContentId, ContentStore, ContentStoreError};

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_KEY_HEADER: &str = "pinata_secret_api_key";

/// API key pair sent with every pinning request.
#[derive(Clone)]
pub struct PinataCredentials {
    pub api_key: String,
    pub secret_api_key: String,
}

impl PinataCredentials {
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ContentStoreError> {
        if self.api_key.trim().is_empty() {
            return Err(ContentStoreError::MissingCredentials(
                "pinata api key is empty".to_string(),
            ));
        }
        if self.secret_api_key.trim().is_empty() {
            return Err(ContentStoreError::MissingCredentials(
                "pinata secret api key is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for PinataCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataCredentials")
            .field("api_key", &"<redacted>")
            .field("secret_api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinFileResponse {
    ipfs_hash: String,
}

/// Hosted pinning service: uploads through the pinning API,
///  downloads through the public gateway.
#[derive(Debug, Clone)]
pub struct PinataStore {
    client: Client,
    api_url: Url,
    gateway_url: Url,
    credentials: PinataCredentials,
}

impl PinataStore {
    pub fn new(
        client: Client,
        api_url: Url,
        gateway_url: Url,
        credentials: PinataCredentials,
    ) -> Self {
        Self {
            client,
            api_url,
            gateway_url,
            credentials,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .header(SECRET_KEY_HEADER, &self.credentials.secret_api_key)
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    async fn store(&self, name: &str, content: Bytes) -> Result<ContentId, ContentStoreError> {
        let url = endpoint(&self.api_url, "/pinning/pinFileToIPFS")?;
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        let part = Part::bytes(content.to_vec())
            .file_name(name.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part("file", part);

        let response = self
            .authorized(self.client.post(url))
            .multipart(form)
            .send()
            .await?;
        let response = error_for_status(response, name).await?;

        let pinned: PinFileResponse = response.json().await?;
        let cid: ContentId = pinned.ipfs_hash.parse()?;
        tracing::debug!(%cid, "pinned document");
        Ok(cid)
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve(&self, cid: &ContentId) -> Result<Bytes, ContentStoreError> {
        let url = endpoint(&self.gateway_url, &format!("/ipfs/{}", cid))?;
        let response = self.client.get(url).send().await?;
        let response = error_for_status(response, &cid.to_string()).await?;
        Ok(response.bytes().await?)
    }

    async fn ping(&self) -> Result<(), ContentStoreError> {
        let url = endpoint(&self.api_url, "/data/testAuthentication")?;
        let response = self.authorized(self.client.get(url)).send().await?;
        error_for_status(response, "testAuthentication").await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "pinata"
    }
}
