use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};

use common::prelude::{Document, Password, UploadResult};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

/// A document upload as sent by the CLI.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content: Vec<u8>,
    /// Registry contract to register against (defaults to the daemon's)
    pub contract_address: Option<String>,
    /// Store the document sealed under this password
    pub password: Option<String>,
}

/// Accepts a multipart form with the document under `document` (or `file`),
///  an optional `contract_address` and an optional `password`.
///
/// A document that never reached the content store is answered with 502 and
///  the failed `UploadResult`. A stored document whose registration failed
///  is still a 200, with the ledger error in `registrationError`.
pub async fn handler(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    let signer = state.signer().cloned().ok_or(UploadError::ReadOnly)?;

    let mut document: Option<Document> = None;
    let mut contract_address: Option<String> = None;
    let mut password: Option<Password> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("failed to read multipart field: {}", e);
        UploadError::Multipart(e.body_text())
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "document" | "file" => {
                let name = field.file_name().unwrap_or("document").to_string();
                let content = field.bytes().await.map_err(|e| {
                    tracing::error!("failed to read document body: {}", e);
                    UploadError::Multipart(e.body_text())
                })?;
                document = Some(Document::new(name, content));
            }
            "contract_address" => {
                let text = field.text().await.map_err(|e| {
                    tracing::error!("failed to read contract_address: {}", e);
                    UploadError::Multipart(e.body_text())
                })?;
                contract_address = Some(text);
            }
            "password" => {
                let text = field.text().await.map_err(|e| {
                    tracing::error!("failed to read password: {}", e);
                    UploadError::Multipart(e.body_text())
                })?;
                let parsed = text
                    .parse::<Password>()
                    .map_err(|e| UploadError::InvalidRequest(e.to_string()))?;
                password = Some(parsed);
            }
            _ => {}
        }
    }

    let mut document =
        document.ok_or_else(|| UploadError::InvalidRequest("document is required".into()))?;
    document.password = password;
    if document.content.is_empty() {
        return Err(UploadError::InvalidRequest("document is empty".into()));
    }
    let contract = state
        .resolve_contract(contract_address.as_deref())
        .map_err(|e| UploadError::InvalidRequest(e.to_string()))?;

    let result = state.documents().upload(document, &contract, &signer).await;
    let status = if result.success {
        http::StatusCode::OK
    } else {
        http::StatusCode::BAD_GATEWAY
    };

    Ok((status, Json(result)).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Multipart error: {0}")]
    Multipart(String),
    #[error("uploads are disabled on a read-only daemon")]
    ReadOnly,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::InvalidRequest(msg) | UploadError::Multipart(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Bad request: {}", msg),
            )
                .into_response(),
            UploadError::ReadOnly => {
                (http::StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
        }
    }
}

impl ApiRequest for UploadRequest {
    type Response = UploadResult;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/documents")?;

        let document = Part::bytes(self.content)
            .file_name(self.file_name.clone())
            .mime_str(
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .as_ref(),
            )?;
        let mut form = Form::new().part("document", document);
        if let Some(contract_address) = self.contract_address {
            form = form.text("contract_address", contract_address);
        }
        if let Some(password) = self.password {
            form = form.text("password", password);
        }

        Ok(client.post(full_url).multipart(form))
    }
}
