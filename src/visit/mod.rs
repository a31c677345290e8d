pub mod closer;
pub mod recorder;

use crate::config::SessionConfig;
use crate::event_log::EventLog;
use crate::geo::GeoClient;
use crate::user_agent::DeviceDetector;
use axum::routing::any;
use axum::Router;
use deadpool_sqlite::Pool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared state for the visit recorder and session closer.
pub struct VisitState {
    pub pool: Pool,
    pub geo: GeoClient,
    pub detector: Arc<dyn DeviceDetector>,
    pub log: Arc<dyn EventLog>,
    pub session: SessionConfig,
    /// Local port of the listener, reported as the visit's destination port.
    pub server_port: u16,
}

/// Visit routes: record on `/` and `/v1/visit`, close on `/v1/visit/end`.
pub fn routes(state: Arc<VisitState>) -> Router {
    // The exit beacon is sent from tracked pages, which may live on any origin
    let end_cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let end_routes = Router::new()
        .route("/v1/visit/end", any(closer::end_visit))
        .layer(end_cors)
        .with_state(state.clone());

    Router::new()
        .route("/", any(recorder::record_visit))
        .route("/v1/visit", any(recorder::record_visit))
        .with_state(state)
        .merge(end_routes)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::VisitState;
    use crate::config::{DatabaseConfig, GeoConfig, SessionConfig};
    use crate::event_log::MemoryLog;
    use crate::geo::GeoClient;
    use crate::storage::sqlite::create_pool;
    use crate::user_agent::UaDeviceDetector;
    use std::sync::Arc;

    /// State whose database can never be opened and whose geolocation
    /// service refuses connections.
    pub fn unreachable_db_state(log: Arc<MemoryLog>) -> Arc<VisitState> {
        let pool = create_pool(&DatabaseConfig {
            path: "/nonexistent-footfall-dir/visits.db".into(),
            pool_size: 1,
        })
        .unwrap();

        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let geo_addr = listener.local_addr().unwrap();
        drop(listener);

        Arc::new(VisitState {
            pool,
            geo: GeoClient::new(&GeoConfig {
                base_url: format!("http://{geo_addr}"),
                timeout_secs: Some(2),
            })
            .unwrap(),
            detector: Arc::new(UaDeviceDetector),
            log,
            session: SessionConfig::default(),
            server_port: 8080,
        })
    }
}
