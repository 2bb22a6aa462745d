//! Account routes
//!
//! - `PUT /api/account/citizenship` - `{citizenship, city}`; refreshes statistics
//! - `POST /api/account/wallet` - `{address}`; binds a wallet to the caller

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{authenticate, json_response, method_not_allowed, not_found, parse_json_body, respond};
use crate::server::{AppState, BoxBody};
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct CitizenshipRequest {
    citizenship: String,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WalletRequest {
    address: String,
}

async fn update_citizenship(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let body: CitizenshipRequest = parse_json_body(req).await?;
    let user = state
        .services
        .auth
        .update_citizenship(&principal.user_id, &body.citizenship, body.city)
        .await?;
    state.services.statistics.schedule_refresh();
    Ok(json_response(StatusCode::OK, &user))
}

async fn connect_wallet(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let body: WalletRequest = parse_json_body(req).await?;
    let user = state
        .services
        .auth
        .connect_wallet(&principal.user_id, &body.address)
        .await?;
    Ok(json_response(StatusCode::OK, &user))
}

pub async fn handle_account_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::PUT, "/api/account/citizenship") => update_citizenship(req, state).await,
        (&Method::POST, "/api/account/wallet") => connect_wallet(req, state).await,
        (_, "/api/account/citizenship") | (_, "/api/account/wallet") => Ok(method_not_allowed()),
        _ => Ok(not_found(&path)),
    };

    respond(result)
}
