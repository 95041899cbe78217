use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// The process is up and serving requests. Dependencies are not checked.
pub async fn handler() -> Response {
    let msg = serde_json::json!({"status": "ok"});
    (StatusCode::OK, Json(msg)).into_response()
}
