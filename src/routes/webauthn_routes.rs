//! Passkey ceremony routes
//!
//! `begin` sets a five-minute ceremony cookie; `finish` consumes it, reads
//! the browser's raw credential JSON and sets the `session` cookie.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    json_response, method_not_allowed, not_found, ok, parse_json_body, read_body, respond,
    with_cookie,
};
use crate::domain::SessionPurpose;
use crate::server::cookies::{clear_cookie, read_cookie, session_cookie};
use crate::server::{AppState, BoxBody};
use crate::types::{PeacemakingError, Result};

#[derive(Debug, Deserialize)]
struct BeginRegistrationRequest {
    email: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct BeginAuthenticationRequest {
    email: String,
}

/// The ceremony token presented with a `finish` call.
///
/// The cookie of the expected ceremony wins; otherwise the other ceremony's
/// cookie is passed through so a mismatched token is reported as such.
fn ceremony_token(req: &Request<Incoming>, expected: SessionPurpose) -> Result<String> {
    let other = match expected {
        SessionPurpose::RegistrationCeremony => SessionPurpose::AuthenticationCeremony,
        _ => SessionPurpose::RegistrationCeremony,
    };
    read_cookie(req.headers(), expected.cookie_name())
        .or_else(|| read_cookie(req.headers(), other.cookie_name()))
        .ok_or_else(|| PeacemakingError::Unauthorized("missing ceremony session".into()))
}

async fn handle_register_begin(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: BeginRegistrationRequest = parse_json_body(req).await?;
    let (options, session) = state
        .services
        .passkeys
        .begin_registration(&body.email, &body.username)
        .await?;

    with_cookie(
        json_response(StatusCode::OK, &options),
        session_cookie(SessionPurpose::RegistrationCeremony, &session.token),
    )
}

async fn handle_register_finish(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let token = ceremony_token(&req, SessionPurpose::RegistrationCeremony)?;
    let response = read_body(req).await?;
    let session = state
        .services
        .passkeys
        .finish_registration(&token, &response)
        .await?;

    let response = with_cookie(ok(), session_cookie(SessionPurpose::Auth, &session.token))?;
    with_cookie(response, clear_cookie(SessionPurpose::RegistrationCeremony))
}

async fn handle_login_begin(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: BeginAuthenticationRequest = parse_json_body(req).await?;
    let (options, session) = state
        .services
        .passkeys
        .begin_authentication(&body.email)
        .await?;

    with_cookie(
        json_response(StatusCode::OK, &options),
        session_cookie(SessionPurpose::AuthenticationCeremony, &session.token),
    )
}

async fn handle_login_finish(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let token = ceremony_token(&req, SessionPurpose::AuthenticationCeremony)?;
    let response = read_body(req).await?;
    let session = state
        .services
        .passkeys
        .finish_authentication(&token, &response)
        .await?;

    let response = with_cookie(ok(), session_cookie(SessionPurpose::Auth, &session.token))?;
    with_cookie(response, clear_cookie(SessionPurpose::AuthenticationCeremony))
}

pub async fn handle_webauthn_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::POST, "/webauthn/register/begin") => handle_register_begin(req, state).await,
        (&Method::POST, "/webauthn/register/finish") => handle_register_finish(req, state).await,
        (&Method::POST, "/webauthn/login/begin") => handle_login_begin(req, state).await,
        (&Method::POST, "/webauthn/login/finish") => handle_login_finish(req, state).await,

        (_, "/webauthn/register/begin")
        | (_, "/webauthn/register/finish")
        | (_, "/webauthn/login/begin")
        | (_, "/webauthn/login/finish") => Ok(method_not_allowed()),

        _ => Ok(not_found(&path)),
    };

    respond(result)
}
