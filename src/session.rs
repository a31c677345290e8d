use crate::config::SessionConfig;
use axum::http::{header, HeaderMap};

/// Session identifier attached to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// True when the id was minted for this request and the cookie still has to be set.
    pub is_new: bool,
}

impl Session {
    /// Reuse the session carried by the request cookie, or start a new one.
    pub fn from_headers(headers: &HeaderMap, config: &SessionConfig) -> Self {
        match extract_session_cookie(headers, &config.cookie_name) {
            Some(id) if is_valid_session_id(&id) => Session { id, is_new: false },
            _ => Session {
                id: new_session_id(),
                is_new: true,
            },
        }
    }

    /// `Set-Cookie` value for a newly minted session, `None` for a reused one.
    pub fn set_cookie(&self, config: &SessionConfig) -> Option<String> {
        self.is_new.then(|| session_cookie(config, &self.id))
    }
}

/// Extract the session cookie value from the Cookie header.
fn extract_session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let prefix = format!("{cookie_name}=");
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_str.split(';') {
            if let Some(value) = part.trim().strip_prefix(prefix.as_str()) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Session ids are opaque, but only url-safe tokens of sane length are accepted back.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Mint a fresh session id: 32 random bytes, URL-safe base64.
pub fn new_session_id() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn session_cookie(config: &SessionConfig, id: &str) -> String {
    let secure_flag = if config.secure { "; Secure" } else { "" };
    format!(
        "{}={id}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure_flag}",
        config.cookie_name, config.ttl_secs
    )
}
