//! Wallet and email authentication routes
//!
//! ## Endpoints
//!
//! - `POST /auth/nonce?address=0x..` - issue the nonce to sign
//! - `POST /auth/verify` - check a signed nonce, set the `session` cookie
//! - `POST /auth/register` - bind a wallet address and an email
//! - `POST /auth/email/register`, `POST /auth/email/login` - password accounts
//! - `POST /auth/logout`, `POST /auth/logout-all`
//! - `GET /auth/me`

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    authenticate, json_response, method_not_allowed, not_found, ok, parse_json_body,
    parse_query, respond, session_token, with_cookie,
};
use crate::auth::AuthOutcome;
use crate::domain::{SessionPurpose, User};
use crate::server::cookies::{clear_cookie, session_cookie};
use crate::server::{AppState, BoxBody};
use crate::types::{PeacemakingError, Result};

/// Where the client goes after a wallet login
const LOGIN_REDIRECT: &str = "/dashboard";

#[derive(Debug, Deserialize)]
struct NonceQuery {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    address: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    address: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct EmailRegisterRequest {
    email: String,
    password: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct EmailLoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// `{user, token}` plus the `session` cookie
fn logged_in(outcome: AuthOutcome, status: StatusCode) -> Result<Response<BoxBody>> {
    let cookie = session_cookie(SessionPurpose::Auth, &outcome.session.token);
    with_cookie(
        json_response(
            status,
            &UserResponse {
                user: outcome.user,
                token: Some(outcome.session.token),
            },
        ),
        cookie,
    )
}

async fn handle_nonce(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let query: NonceQuery = parse_query(&req)?;
    let address = query
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| PeacemakingError::BadRequest("address is required".into()))?;

    let nonce = state.services.auth.generate_nonce(&address).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "nonce": nonce }),
    ))
}

async fn handle_verify(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let body: VerifyRequest = parse_json_body(req).await?;
    let outcome = state
        .services
        .auth
        .verify_signature(&body.address, &body.signature)
        .await?;

    if !outcome.valid {
        return Ok(json_response(
            StatusCode::UNAUTHORIZED,
            &VerifyResponse {
                valid: false,
                token: String::new(),
                redirect: None,
            },
        ));
    }

    let cookie = session_cookie(SessionPurpose::Auth, &outcome.token);
    with_cookie(
        json_response(
            StatusCode::OK,
            &VerifyResponse {
                valid: true,
                token: outcome.token,
                redirect: Some(LOGIN_REDIRECT),
            },
        ),
        cookie,
    )
}

async fn handle_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: RegisterRequest = parse_json_body(req).await?;
    let outcome = state
        .services
        .auth
        .register(&body.address, &body.email)
        .await?;
    logged_in(outcome, StatusCode::OK)
}

async fn handle_email_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: EmailRegisterRequest = parse_json_body(req).await?;
    let outcome = state
        .services
        .auth
        .register_with_email(&body.email, &body.password, &body.username)
        .await?;
    logged_in(outcome, StatusCode::CREATED)
}

async fn handle_email_login(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: EmailLoginRequest = parse_json_body(req).await?;
    let outcome = state
        .services
        .auth
        .login_with_email(&body.email, &body.password)
        .await?;
    logged_in(outcome, StatusCode::OK)
}

/// Logout always clears the cookie, even without a live session
async fn handle_logout(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    if let Some(token) = session_token(req.headers()) {
        state.services.auth.logout(&token).await?;
    }
    with_cookie(ok(), clear_cookie(SessionPurpose::Auth))
}

async fn handle_logout_all(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let removed = state.services.auth.logout_all(&principal.user_id).await?;
    with_cookie(
        json_response(
            StatusCode::OK,
            &serde_json::json!({ "success": true, "sessionsRemoved": removed }),
        ),
        clear_cookie(SessionPurpose::Auth),
    )
}

async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let user = state.services.auth.me(&principal.user_id).await?;
    Ok(json_response(
        StatusCode::OK,
        &UserResponse { user, token: None },
    ))
}

pub async fn handle_auth_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::POST, "/auth/nonce") => handle_nonce(req, state).await,
        (&Method::POST, "/auth/verify") => handle_verify(req, state).await,
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/email/register") => handle_email_register(req, state).await,
        (&Method::POST, "/auth/email/login") => handle_email_login(req, state).await,
        (&Method::POST, "/auth/logout") => handle_logout(req, state).await,
        (&Method::POST, "/auth/logout-all") => handle_logout_all(req, state).await,
        (&Method::GET, "/auth/me") => handle_me(req, state).await,

        (_, "/auth/nonce")
        | (_, "/auth/verify")
        | (_, "/auth/register")
        | (_, "/auth/email/register")
        | (_, "/auth/email/login")
        | (_, "/auth/logout")
        | (_, "/auth/logout-all")
        | (_, "/auth/me") => Ok(method_not_allowed()),

        _ => Ok(not_found(&path)),
    };

    respond(result)
}
