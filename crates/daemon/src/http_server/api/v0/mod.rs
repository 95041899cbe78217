use axum::Router;

pub mod documents;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/documents", documents::router(state.clone()))
        .with_state(state)
}
