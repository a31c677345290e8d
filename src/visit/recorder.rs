use super::VisitState;
use crate::context::RequestContext;
use crate::error::AppResult;
use crate::event_log::Severity;
use crate::report::render_report;
use crate::storage::visitors::insert_visit;
use crate::types::{NewVisit, StatusResponse};
use crate::user_agent::{classify_browser, classify_device};
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

/// Gather everything known about the visitor and store it as an open visit.
pub async fn capture_visit(state: &VisitState, ctx: &RequestContext) -> AppResult<NewVisit> {
    let ip_address = ctx.client_ip();
    let geo = state.geo.locate(&ip_address, state.log.as_ref()).await;

    let user_agent = ctx.user_agent().to_string();
    let browser = classify_browser(&user_agent);
    let device_type = classify_device(state.detector.as_ref(), &user_agent);

    let visit = NewVisit {
        ip_address,
        region: geo.region,
        destination_port: ctx.server_port,
        session_id: ctx.session.id.clone(),
        user_agent,
        device_type,
        browser,
        city: geo.city,
        asn: geo.asn,
        isp: geo.isp,
        latitude: geo.latitude,
        longitude: geo.longitude,
    };

    let id = insert_visit(&state.pool, visit.clone()).await?;
    tracing::info!(
        visit_id = id,
        ip = %visit.ip_address,
        device = %visit.device_type,
        browser = %visit.browser,
        "visit recorded"
    );

    Ok(visit)
}

/// ANY / and /v1/visit - Record a page view and render the visitor report.
///
/// Failures come back as a JSON `{"status":"error"}` body with HTTP 200.
pub async fn record_visit(State(state): State<Arc<VisitState>>, ctx: RequestContext) -> Response {
    let mut response = match capture_visit(&state, &ctx).await {
        Ok(visit) => Html(render_report(&visit)).into_response(),
        Err(e) => {
            state.log.log(Severity::Error, &format!("Error: {e}"));
            Json(StatusResponse::error(e.to_string())).into_response()
        }
    };

    if let Some(cookie) = ctx.session.set_cookie(&state.session) {
        match cookie.parse::<HeaderValue>() {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
        }
    }

    response
}
