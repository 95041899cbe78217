use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(Err(e)) => failure(&e.to_string()),
        Err(_) => failure("health check timed out"),
    }
}

fn failure(message: &str) -> Response {
    let msg = serde_json::json!({"status": "failure", "message": message});
    (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
}
