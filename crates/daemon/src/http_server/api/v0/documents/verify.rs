use axum::extract::{Json, Path, Query, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{Fingerprint, VerificationResult};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct VerifyRequest {
    /// Fingerprint the document was registered under
    #[arg(long = "hash")]
    #[serde(skip)]
    pub fingerprint: String,

    /// Registry contract to look in (defaults to the daemon's)
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub contract_address: Option<String>,
}

/// Look a fingerprint up. An unregistered fingerprint is a 200 with
///  `exists: false`; only a failed ledger call is a 502.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(fingerprint): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, VerifyError> {
    fingerprint
        .parse::<Fingerprint>()
        .map_err(|e| VerifyError::InvalidRequest(e.to_string()))?;
    let contract = state
        .resolve_contract(query.contract_address.as_deref())
        .map_err(|e| VerifyError::InvalidRequest(e.to_string()))?;

    let result = state.documents().verify(&fingerprint, &contract).await;
    let status = if result.success {
        http::StatusCode::OK
    } else {
        http::StatusCode::BAD_GATEWAY
    };

    Ok((status, Json(result)).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        match self {
            VerifyError::InvalidRequest(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Bad request: {}", msg),
            )
                .into_response(),
        }
    }
}

impl ApiRequest for VerifyRequest {
    type Response = VerificationResult;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let mut full_url = base_url.join("/api/v0/documents/")?;
        full_url
            .path_segments_mut()
            .map_err(|_| ApiError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(self.fingerprint.trim())
            .push("verify");
        Ok(client.get(full_url).query(&self))
    }
}
