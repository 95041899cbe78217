use std::future::IntoFuture;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod handlers;
mod health;

pub use config::Config;

use crate::ServiceState;

const API_PREFIX: &str = "/api";
const STATUS_PREFIX: &str = "/_status";

/// Maximum upload size in bytes (10 MiB)
pub const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// How long in-flight requests get to finish once shutdown starts. Uploads
///  wait on a transaction receipt, so this is longer than a plain request needs.
pub const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(15);

/// The full daemon router: /_status health checks and the /api routes.
pub fn router(config: Config, state: ServiceState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(config.log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(API_PREFIX, api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE_BYTES))
        .with_state(state)
        .layer(trace_layer)
        .layer(SetSensitiveRequestHeadersLayer::new([
            http::HeaderName::from_static(api::v0::documents::retrieve::PASSWORD_HEADER),
        ]))
}

/// Serve the API on an already bound listener until the shutdown receiver
///  fires.
pub async fn run_api(
    listener: TcpListener,
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    tracing::info!(addr = ?listener.local_addr()?, "API server listening");
    serve_until(listener, router(config, state), shutdown_rx, REQUEST_GRACE_PERIOD).await
}

/// Stop accepting connections as soon as shutdown fires, then give
///  in-flight requests at most `grace` to finish.
async fn serve_until(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<()>,
    grace: Duration,
) -> Result<(), HttpServerError> {
    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            let _ = drain_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(?grace, "in-flight requests still running, closing anyway");
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
