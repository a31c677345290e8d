pub mod config;
pub mod context;
pub mod error;
pub mod event_log;
pub mod geo;
pub mod query;
pub mod report;
pub mod session;
pub mod storage;
pub mod types;
pub mod user_agent;
pub mod visit;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;

/// Exit beacons carry two short form fields; anything larger is not ours.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Full application router.
pub fn app(visit_state: Arc<visit::VisitState>, query_state: Arc<query::handler::QueryState>) -> Router {
    Router::new()
        .merge(visit::routes(visit_state))
        .merge(query::routes(query_state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
