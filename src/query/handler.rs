use crate::error::{AppError, AppResult};
use crate::storage::visitors::list_visits;
use crate::types::{HealthResponse, VisitQueryParams, VisitorRecord};
use axum::extract::{Query, State};
use axum::Json;
use deadpool_sqlite::Pool;
use std::sync::Arc;

pub struct QueryState {
    pub pool: Pool,
}

/// GET /v1/visits - List recorded visits, newest first.
pub async fn list_visits_handler(
    State(state): State<Arc<QueryState>>,
    Query(params): Query<VisitQueryParams>,
) -> AppResult<Json<Vec<VisitorRecord>>> {
    if params.session_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::Validation(
            "session_id filter must not be empty".to_string(),
        ));
    }
    let visits = list_visits(&state.pool, params).await?;
    Ok(Json(visits))
}

/// GET /health - Liveness plus a database ping.
pub async fn health(State(state): State<Arc<QueryState>>) -> Json<HealthResponse> {
    let db_ok = match state.pool.get().await {
        Ok(conn) => conn
            .interact(|conn| conn.execute_batch("SELECT 1"))
            .await
            .is_ok_and(|r| r.is_ok()),
        Err(_) => false,
    };

    Json(HealthResponse {
        status: if db_ok {
            "ok".into()
        } else {
            "degraded".into()
        },
        db_ok,
    })
}
