use axum::routing::{get, post};
use axum::Router;

pub mod retrieve;
pub mod upload;
pub mod verify;

pub use retrieve::RetrieveRequest;
pub use upload::UploadRequest;
pub use verify::VerifyRequest;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(upload::handler))
        .route("/retrieve", get(retrieve::handler))
        .route("/:fingerprint/verify", get(verify::handler))
        .with_state(state)
}
