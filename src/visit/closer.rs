use super::VisitState;
use crate::error::AppError;
use crate::event_log::Severity;
use crate::storage::visitors::close_visit;
use crate::types::StatusResponse;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

pub const MSG_UPDATED: &str = "End time updated successfully.";
pub const MSG_DB_FAILED: &str = "Database update failed.";
pub const MSG_INVALID_SESSION: &str = "Invalid session ID.";

/// Form body of the exit beacon. Fields stay strings so a malformed
/// duration never rejects the whole request.
#[derive(Debug, Default, Deserialize)]
pub struct EndVisitForm {
    pub session_id: Option<String>,
    pub total_time_spent: Option<String>,
}

/// Seconds spent on the page; missing or unparseable values count as 0.
pub fn parse_time_spent(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    let secs = raw
        .parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f as i64)
        })
        .unwrap_or(0);
    secs.max(0)
}

/// POST /v1/visit/end - Stamp end time and duration on the session's open visit.
///
/// Answers HTTP 200 with a JSON status for everything except a wrong
/// method (405). A session with no open visit still reports success.
pub async fn end_visit(
    State(state): State<Arc<VisitState>>,
    method: Method,
    form: Result<Form<EndVisitForm>, FormRejection>,
) -> Response {
    if method != Method::POST {
        return AppError::MethodNotAllowed.into_response();
    }

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable exit beacon body");
            EndVisitForm::default()
        }
    };

    // Whitespace-only ids are rejected, but the id is matched exactly as sent
    let session_id = form.session_id.unwrap_or_default();
    if session_id.trim().is_empty() {
        return Json(StatusResponse::error(MSG_INVALID_SESSION)).into_response();
    }

    let total_time_spent = parse_time_spent(form.total_time_spent.as_deref());

    let body = match close_visit(&state.pool, session_id.clone(), total_time_spent).await {
        Ok(updated) => {
            tracing::info!(
                session_id = %session_id,
                total_time_spent,
                updated,
                "visit closed"
            );
            StatusResponse::success(MSG_UPDATED)
        }
        Err(e) => {
            state.log.log(
                Severity::Error,
                &format!("Error updating end_time and total_time_spent: {e}"),
            );
            StatusResponse::error(MSG_DB_FAILED)
        }
    };

    Json(body).into_response()
}
