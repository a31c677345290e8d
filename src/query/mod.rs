pub mod handler;

use axum::routing::get;
use axum::Router;
use handler::QueryState;
use std::sync::Arc;

/// Read-only routes: health check and visit listing.
pub fn routes(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/v1/visits", get(handler::list_visits_handler))
        .with_state(state)
}
