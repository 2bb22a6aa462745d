//! HTTP routes for Proof of Peacemaking
//!
//! Each group exposes one `handle_*_request` entry point that matches on
//! method and path segments. Handlers return `Result` and the entry point
//! turns errors into `{"error", "message"}` JSON bodies.

pub mod account;
pub mod auth_routes;
pub mod conversations;
pub mod health;
pub mod interaction;
pub mod notifications;
pub mod statistics;
pub mod webauthn_routes;

pub use account::handle_account_request;
pub use auth_routes::handle_auth_request;
pub use conversations::handle_conversation_request;
pub use health::health_check;
pub use interaction::handle_interaction_request;
pub use notifications::handle_notification_request;
pub use statistics::handle_statistics;
pub use webauthn_routes::handle_webauthn_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::domain::{Principal, SessionPurpose};
use crate::server::cookies::read_cookie;
use crate::server::{AppState, BoxBody};
use crate::types::{PeacemakingError, Result};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Response Helpers
// =============================================================================

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn apply_cors(response: &mut Response<BoxBody>) {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    apply_cors(&mut response);
    response
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = Response::new(full_body(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    apply_cors(&mut response);
    response
        .headers_mut()
        .insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

pub fn error_response(err: PeacemakingError) -> Response<BoxBody> {
    if err.status_code().is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        debug!(error = %err, "Request rejected");
    }
    let (status, body) = err.into_status_code_and_body();
    let mut response = Response::new(full_body(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    apply_cors(&mut response);
    response
}

pub fn not_found(path: &str) -> Response<BoxBody> {
    error_response(PeacemakingError::NotFound(format!("no route for {}", path)))
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({
            "error": "MethodNotAllowed",
            "message": "method not allowed",
        }),
    )
}

/// Collapse a handler result into a response
fn respond(result: Result<Response<BoxBody>>) -> Response<BoxBody> {
    result.unwrap_or_else(error_response)
}

/// Attach a `Set-Cookie` header
fn with_cookie(mut response: Response<BoxBody>, cookie: String) -> Result<Response<BoxBody>> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| PeacemakingError::Internal(format!("invalid cookie value: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

fn ok() -> Response<BoxBody> {
    json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Non-empty path segments, e.g. `/api/proofs/approve/x` -> `[api, proofs, approve, x]`
fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes> {
    let body = req
        .collect()
        .await
        .map_err(|e| PeacemakingError::BadRequest(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(PeacemakingError::BadRequest("Request body too large".into()));
    }
    Ok(bytes)
}

async fn parse_json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let bytes = read_body(req).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PeacemakingError::BadRequest(format!("Invalid JSON: {}", e)))
}

fn parse_query<T: DeserializeOwned>(req: &Request<Incoming>) -> Result<T> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| PeacemakingError::BadRequest(format!("Invalid query: {}", e)))
}

/// Token from the `session` cookie, else from `Authorization: Bearer <token>`
/// (a bare token is accepted as well)
fn session_token(headers: &HeaderMap<HeaderValue>) -> Option<String> {
    if let Some(token) = read_cookie(headers, SessionPurpose::Auth.cookie_name()) {
        return Some(token);
    }
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The authenticated caller, or `Unauthorized`
async fn authenticate(state: &AppState, headers: &HeaderMap<HeaderValue>) -> Result<Principal> {
    let token = session_token(headers)
        .ok_or_else(|| PeacemakingError::Unauthorized("authentication required".into()))?;
    let user = state.services.auth.authenticate(&token).await?;
    Ok(user.principal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::COOKIE;

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("/api/proofs/approve/abc/"),
            vec!["api", "proofs", "approve", "abc"]
        );
        assert!(segments("/").is_empty());
    }

    #[test]
    fn test_session_token_sources() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok-a"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok-a"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("tok-b"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok-b"));

        headers.insert(COOKIE, HeaderValue::from_static("session=tok-c"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok-c"));

        let empty = HeaderMap::new();
        assert_eq!(session_token(&empty), None);
    }

    #[test]
    fn test_error_body_shape() {
        let response = error_response(PeacemakingError::Conflict("already approved".into()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
