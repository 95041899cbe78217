use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Fallback for unknown routes. JSON clients get a JSON body.
pub async fn not_found_handler(uri: Uri, headers: HeaderMap) -> Response {
    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    tracing::debug!(path = %uri.path(), "no route");

    if wants_json {
        let msg = serde_json::json!({"msg": "not found", "path": uri.path()});
        (StatusCode::NOT_FOUND, Json(msg)).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("not found: {}", uri.path()),
        )
            .into_response()
    }
}
