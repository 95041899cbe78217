use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{ContentId, ContentStoreError, EncryptionError, Password, RetrievalError};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrieveRequest {
    #[serde(default)]
    pub cid: String,
    /// Name to hand the download; also picks the content type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Open a password protected document; sent as a header, never in the URL
    #[serde(skip)]
    pub password: Option<String>,
}

/// Carries the password for a sealed document.
pub const PASSWORD_HEADER: &str = "x-document-password";

/// Stream a stored document back as an attachment. Sealed documents are
///  opened when the password header is present and returned as stored
///  otherwise.
pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Query(req): Query<RetrieveRequest>,
) -> Result<Response, RetrieveError> {
    if req.cid.trim().is_empty() {
        return Err(RetrieveError::InvalidRequest("cid is required".into()));
    }
    let cid: ContentId = req
        .cid
        .parse()
        .map_err(|e: ContentStoreError| RetrieveError::InvalidRequest(e.to_string()))?;
    let password = headers
        .get(PASSWORD_HEADER)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| RetrieveError::InvalidRequest("password is not valid text".into()))?
                .parse::<Password>()
                .map_err(|e| RetrieveError::InvalidRequest(e.to_string()))
        })
        .transpose()?;

    let content = state.documents().retrieve(&cid, password.as_ref()).await?;

    let file_name = req
        .file_name
        .as_deref()
        .map(str::trim)
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| cid.to_string());
    let mime_type = mime_guess::from_path(&file_name).first_or_octet_stream();
    let disposition = format!("attachment; filename=\"{}\"", file_name);

    Ok((
        http::StatusCode::OK,
        [
            (axum::http::header::CONTENT_TYPE, mime_type.as_ref()),
            (axum::http::header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        content,
    )
        .into_response())
}

/// Keep only the final path component, and nothing that would break
///  out of the quoted header value.
fn sanitize_file_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
}

impl IntoResponse for RetrieveError {
    fn into_response(self) -> Response {
        match self {
            RetrieveError::InvalidRequest(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Bad request: {}", msg),
            )
                .into_response(),
            RetrieveError::Retrieval(RetrievalError::ContentStore(
                ContentStoreError::NotFound(cid),
            )) => (http::StatusCode::NOT_FOUND, format!("Not found: {}", cid)).into_response(),
            RetrieveError::Retrieval(RetrievalError::Encryption(
                e @ EncryptionError::DecryptionFailed,
            )) => (http::StatusCode::FORBIDDEN, e.to_string()).into_response(),
            RetrieveError::Retrieval(RetrievalError::Encryption(e @ EncryptionError::NotSealed)) => {
                (http::StatusCode::BAD_REQUEST, format!("Bad request: {}", e)).into_response()
            }
            RetrieveError::Retrieval(e) => {
                tracing::error!("failed to retrieve document: {}", e);
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

impl ApiRequest for RetrieveRequest {
    // The body is the raw document; callers use `ApiClient::call_raw`
    type Response = serde_json::Value;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/documents/retrieve")?;
        let mut request = client.get(full_url).query(&self);
        if let Some(password) = &self.password {
            request = request.header(PASSWORD_HEADER, password);
        }
        Ok(request)
    }
}
