use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{endpoint, error_for_status, ContentId, ContentStore, ContentStoreError};

/// Where a [`KuboStore`] reads content back from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    /// `cat` through the node's RPC API.
    Node,
    /// Plain `GET /ipfs/{cid}` against an HTTP gateway.
    Gateway(Url),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionResponse {
    version: String,
}

/// A local IPFS (kubo) node reached over its HTTP RPC API.
#[derive(Debug, Clone)]
pub struct KuboStore {
    client: Client,
    api_url: Url,
    retrieval: Retrieval,
}

impl KuboStore {
    pub fn new(client: Client, api_url: Url, retrieval: Retrieval) -> Self {
        Self {
            client,
            api_url,
            retrieval,
        }
    }

    pub fn with_retrieval(self, retrieval: Retrieval) -> Self {
        Self { retrieval, ..self }
    }

    pub fn retrieval(&self) -> &Retrieval {
        &self.retrieval
    }
}

#[async_trait]
impl ContentStore for KuboStore {
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    async fn store(&self, name: &str, content: Bytes) -> Result<ContentId, ContentStoreError> {
        let url = endpoint(&self.api_url, "/api/v0/add")?;
        let part = Part::bytes(content.to_vec()).file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .query(&[("pin", "true")])
            .multipart(form)
            .send()
            .await?;
        let response = error_for_status(response, name).await?;

        let added: AddResponse = response.json().await?;
        let cid: ContentId = added.hash.parse()?;
        tracing::debug!(%cid, "added document to local node");
        Ok(cid)
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve(&self, cid: &ContentId) -> Result<Bytes, ContentStoreError> {
        let cid_str = cid.to_string();
        let request = match &self.retrieval {
            Retrieval::Node => self
                .client
                .post(endpoint(&self.api_url, "/api/v0/cat")?)
                .query(&[("arg", cid_str.as_str())]),
            Retrieval::Gateway(gateway) => self
                .client
                .get(endpoint(gateway, &format!("/ipfs/{}", cid_str))?),
        };

        let response = error_for_status(request.send().await?, &cid_str).await?;
        Ok(response.bytes().await?)
    }

    async fn ping(&self) -> Result<(), ContentStoreError> {
        let url = endpoint(&self.api_url, "/api/v0/version")?;
        let response = self.client.post(url).send().await?;
        let response = error_for_status(response, "version").await?;
        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| ContentStoreError::InvalidResponse(e.to_string()))?;
        tracing::debug!(version = %version.version, "ipfs node reachable");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        match self.retrieval {
            Retrieval::Node => "ipfs-node",
            Retrieval::Gateway(_) => "ipfs-gateway",
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn node_for(server: &MockServer) -> KuboStore {
        KuboStore::new(
            Client::new(),
            Url::parse(&server.base_url()).unwrap(),
            Retrieval::Node,
        )
    }

    #[tokio::test]
    async fn test_add_returns_hash() {
        let server = MockServer::start_async().await;
        let add = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v0/add")
                    .query_param("pin", "true")
                    .body_contains("HELLOWRLD");
                then.status(200)
                    .json_body(json!({"Name": "hello.txt", "Hash": CID, "Size": "17"}));
            })
            .await;

        let cid = node_for(&server)
            .store("hello.txt", Bytes::from_static(b"HELLOWRLD"))
            .await
            .unwrap();

        add.assert_async().await;
        assert_eq!(cid.to_string(), CID);
    }

    #[tokio::test]
    async fn test_add_surfaces_node_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v0/add");
                then.status(500)
                    .json_body(json!({"Message": "repo locked", "Code": 0}));
            })
            .await;

        let err = node_for(&server)
            .store("hello.txt", Bytes::from_static(b"HELLOWRLD"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentStoreError::HttpStatus(status, _) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn test_cat_through_node() {
        let server = MockServer::start_async().await;
        let cat = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v0/cat").query_param("arg", CID);
                then.status(200).body("HELLOWRLD");
            })
            .await;

        let cid: ContentId = CID.parse().unwrap();
        let bytes = node_for(&server).retrieve(&cid).await.unwrap();

        cat.assert_async().await;
        assert_eq!(&bytes[..], b"HELLOWRLD");
    }

    #[tokio::test]
    async fn test_gateway_retrieval_bypasses_node() {
        let node = MockServer::start_async().await;
        let gateway = MockServer::start_async().await;
        let cat = node
            .mock_async(|when, then| {
                when.method(POST).path("/api/v0/cat");
                then.status(200).body("wrong");
            })
            .await;
        let get = gateway
            .mock_async(|when, then| {
                when.method(GET).path(format!("/ipfs/{}", CID));
                then.status(200).body("HELLOWRLD");
            })
            .await;

        let store = node_for(&node).with_retrieval(Retrieval::Gateway(
            Url::parse(&gateway.base_url()).unwrap(),
        ));
        let cid: ContentId = CID.parse().unwrap();
        let bytes = store.retrieve(&cid).await.unwrap();

        assert_eq!(&bytes[..], b"HELLOWRLD");
        get.assert_async().await;
        assert_eq!(cat.hits_async().await, 0);
        assert_eq!(store.backend(), "ipfs-gateway");
    }

    #[tokio::test]
    async fn test_ping_reads_version() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v0/version");
                then.status(200)
                    .json_body(json!({"Version": "0.27.0", "Commit": "", "Repo": "15"}));
            })
            .await;

        node_for(&server).ping().await.unwrap();
    }
}
