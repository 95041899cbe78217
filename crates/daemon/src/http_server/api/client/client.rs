use bytes::Bytes;
use reqwest::{Client, Response};
use url::Url;

use super::error::ApiError;
use super::ApiRequest;

/// Thin client for the daemon API, used by the CLI.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        // Content-Type is left to each request: multipart sets its own, GETs carry none
        let client = Client::builder().build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Send the request and decode its JSON response.
    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let response = self.send(request).await?;
        Ok(response.json::<T::Response>().await?)
    }

    /// Send the request and hand back the raw response body.
    pub async fn call_raw<T: ApiRequest>(&self, request: T) -> Result<Bytes, ApiError> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?)
    }

    async fn send<T: ApiRequest>(&self, request: T) -> Result<Response, ApiError> {
        let response = request
            .build_request(&self.remote, &self.client)?
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use common::prelude::VerificationResult;

    use super::*;
    use crate::http_server::api::v0::documents::VerifyRequest;

    // `exists` echoes whether the request carried a Content-Type
    async fn echo_content_type(headers: HeaderMap) -> Json<VerificationResult> {
        Json(VerificationResult {
            success: true,
            exists: headers.contains_key(http::header::CONTENT_TYPE),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_get_requests_carry_no_content_type() {
        let app = Router::new().route(
            "/api/v0/documents/:fingerprint/verify",
            get(echo_content_type),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let remote = Url::parse(&format!("http://{}", addr)).unwrap();
        let client = ApiClient::new(&remote).unwrap();
        let result = client
            .call(VerifyRequest {
                fingerprint: "48454c4c4f".into(),
                contract_address: None,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert!(!result.exists);
    }
}
