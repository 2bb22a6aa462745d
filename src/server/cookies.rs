//! Session cookies
//!
//! Three cookie names carry session tokens, one per `SessionPurpose`. All are
//! `HttpOnly; Secure; SameSite=Strict` with a max-age equal to the session
//! lifetime.

use hyper::header::{HeaderMap, HeaderValue, COOKIE};

use crate::domain::SessionPurpose;

/// `Set-Cookie` value carrying `token` for a session of `purpose`
pub fn session_cookie(purpose: SessionPurpose, token: &str) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Strict",
        purpose.cookie_name(),
        token,
        purpose.ttl().num_seconds()
    )
}

/// `Set-Cookie` value that removes the cookie for `purpose`
pub fn clear_cookie(purpose: SessionPurpose) -> String {
    format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Strict",
        purpose.cookie_name()
    )
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn read_cookie(headers: &HeaderMap<HeaderValue>, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
