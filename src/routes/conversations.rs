//! Conversation routes
//!
//! ## Endpoints
//!
//! - `GET /api/conversations?status=live`, `GET /api/conversations/:id` - public
//! - `POST /api/conversations` - schedule one
//! - `PUT /api/conversations/:id/start`, `PUT /api/conversations/:id/end`
//! - `POST|DELETE /api/conversations/:id/subscribe`
//! - `GET /api/conversations/:id/token` - room join credentials

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    authenticate, json_response, method_not_allowed, not_found, parse_json_body, parse_query,
    respond, segments,
};
use crate::domain::{ConversationStatus, NewConversation};
use crate::server::{AppState, BoxBody};
use crate::types::{PeacemakingError, Result};

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

async fn list(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let query: ListQuery = parse_query(&req)?;
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(ConversationStatus::parse(s).ok_or_else(|| {
            PeacemakingError::BadRequest(format!("unknown conversation status: {}", s))
        })?),
    };
    let conversations = state.services.conversations.list(status).await?;
    Ok(json_response(StatusCode::OK, &conversations))
}

async fn create(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let input: NewConversation = parse_json_body(req).await?;
    let conversation = state
        .services
        .conversations
        .create(&principal, input)
        .await?;
    Ok(json_response(StatusCode::CREATED, &conversation))
}

async fn act(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
    action: &str,
) -> Result<Response<BoxBody>> {
    let principal = authenticate(&state, req.headers()).await?;
    let conversations = &state.services.conversations;

    let conversation = match action {
        "start" => conversations.start(&principal, id).await?,
        "end" => conversations.end(&principal, id).await?,
        "subscribe" => conversations.subscribe(&principal, id).await?,
        "unsubscribe" => conversations.unsubscribe(&principal, id).await?,
        "token" => {
            let token = conversations.join_token(&principal, id).await?;
            return Ok(json_response(StatusCode::OK, &token));
        }
        _ => return Ok(not_found(req.uri().path())),
    };
    Ok(json_response(StatusCode::OK, &conversation))
}

pub async fn handle_conversation_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "conversations"]) => list(req, state).await,
        (&Method::POST, ["api", "conversations"]) => create(req, state).await,
        (&Method::GET, ["api", "conversations", id]) => state
            .services
            .conversations
            .get(id)
            .await
            .map(|c| json_response(StatusCode::OK, &c)),
        (&Method::PUT, ["api", "conversations", id, action @ ("start" | "end")]) => {
            act(req, state, id, action).await
        }
        (&Method::POST, ["api", "conversations", id, "subscribe"]) => {
            act(req, state, id, "subscribe").await
        }
        (&Method::DELETE, ["api", "conversations", id, "subscribe"]) => {
            act(req, state, id, "unsubscribe").await
        }
        (&Method::GET, ["api", "conversations", id, "token"]) => {
            act(req, state, id, "token").await
        }
        (_, ["api", "conversations", ..]) => Ok(method_not_allowed()),
        _ => Ok(not_found(&path)),
    };

    respond(result)
}
