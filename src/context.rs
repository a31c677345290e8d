use crate::session::Session;
use crate::visit::VisitState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

pub const FALLBACK_IP: &str = "0.0.0.0";

/// Connection metadata and session for one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub headers: HeaderMap,
    pub peer: Option<SocketAddr>,
    pub server_port: u16,
    pub session: Session,
}

impl RequestContext {
    pub fn client_ip(&self) -> String {
        resolve_client_ip(&self.headers, self.peer)
    }

    pub fn user_agent(&self) -> &str {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
    }
}

impl FromRequestParts<Arc<VisitState>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<VisitState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let session = Session::from_headers(&parts.headers, &state.session);

        Ok(RequestContext {
            headers: parts.headers.clone(),
            peer,
            server_port: state.server_port,
            session,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the client IP: `Client-IP`, then the last `X-Forwarded-For` hop,
/// then the peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, "client-ip") {
        return ip.to_string();
    }
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        let last = forwarded.rsplit(',').next().unwrap_or("").trim();
        if !last.is_empty() {
            return last.to_string();
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => FALLBACK_IP.to_string(),
    }
}
