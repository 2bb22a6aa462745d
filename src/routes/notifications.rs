//! Notification routes
//!
//! ## Endpoints
//!
//! - `GET /api/notifications` - the caller's notifications, newest first
//! - `PUT /api/notifications/:id/read`, `PUT /api/notifications/read-all`
//! - `GET /api/notifications/unread-count`
//! - `GET /api/notifications/ws` - live feed as JSON text frames
//!
//! The WebSocket holds one bus subscription. Closing the socket fires the
//! subscription's cancel signal.

use futures_util::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::{
    authenticate, json_response, method_not_allowed, not_found, ok, parse_query, respond,
    segments,
};
use crate::domain::Principal;
use crate::notifications::NotificationBus;
use crate::server::{AppState, BoxBody};
use crate::types::{PeacemakingError, Result};

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket handshake, so `?token=` is
/// accepted alongside the cookie
async fn ws_principal(req: &Request<Incoming>, state: &AppState) -> Result<Principal> {
    match authenticate(state, req.headers()).await {
        Err(PeacemakingError::Unauthorized(_)) => {
            let query: WsQuery = parse_query(req)?;
            let token = query
                .token
                .ok_or_else(|| PeacemakingError::Unauthorized("authentication required".into()))?;
            Ok(state.services.auth.authenticate(&token).await?.principal())
        }
        other => other,
    }
}

async fn handle_ws(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    if !hyper_tungstenite::is_upgrade_request(&req) {
        return Err(PeacemakingError::BadRequest(
            "WebSocket upgrade required".into(),
        ));
    }
    let principal = ws_principal(&req, &state).await?;

    let (response, websocket) = hyper_tungstenite::upgrade(req, None)
        .map_err(|e| PeacemakingError::BadRequest(format!("WebSocket upgrade failed: {}", e)))?;

    let bus = Arc::clone(&state.services.notifications);
    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => relay(ws, bus, principal.user_id).await,
            Err(e) => error!("WebSocket connection failed: {}", e),
        }
    });

    Ok(response.map(|body| body.map_err(|never| match never {}).boxed()))
}

/// Forward the caller's live notifications until either side closes
async fn relay(ws: HyperWebSocket, bus: Arc<NotificationBus>, user_id: String) {
    let (mut sender, mut receiver) = ws.split();
    let (cancel, cancelled) = oneshot::channel();
    let mut stream = bus.subscribe(&user_id, cancelled);

    info!(user_id = %user_id, "Notification socket connected");

    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(notification) = next else { break };
                let text = match serde_json::to_string(&notification) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Unserializable notification skipped");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = cancel.send(());
    debug!(user_id = %user_id, "Notification socket closed");
}

pub async fn handle_notification_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "notifications", "ws"]) => handle_ws(req, state).await,
        (&Method::GET, ["api", "notifications"]) => {
            route(req, state, |state, principal| async move {
                let list = state
                    .services
                    .notifications
                    .list_for_user(&principal.user_id)
                    .await?;
                Ok(json_response(StatusCode::OK, &list))
            })
            .await
        }
        (&Method::GET, ["api", "notifications", "unread-count"]) => {
            route(req, state, |state, principal| async move {
                let count = state
                    .services
                    .notifications
                    .unread_count(&principal.user_id)
                    .await?;
                Ok(json_response(
                    StatusCode::OK,
                    &serde_json::json!({ "count": count }),
                ))
            })
            .await
        }
        (&Method::PUT, ["api", "notifications", "read-all"]) => {
            route(req, state, |state, principal| async move {
                let updated = state
                    .services
                    .notifications
                    .mark_all_read(&principal.user_id)
                    .await?;
                Ok(json_response(
                    StatusCode::OK,
                    &serde_json::json!({ "success": true, "updated": updated }),
                ))
            })
            .await
        }
        (&Method::PUT, ["api", "notifications", id, "read"]) => {
            let id = id.to_string();
            route(req, state, |state, principal| async move {
                state
                    .services
                    .notifications
                    .mark_read(&principal.user_id, &id)
                    .await?;
                Ok(ok())
            })
            .await
        }
        (_, ["api", "notifications", ..]) => Ok(method_not_allowed()),
        _ => Ok(not_found(&path)),
    };

    respond(result)
}

/// Authenticate, then run a body-less handler
async fn route<F, Fut>(
    req: Request<Incoming>,
    state: Arc<AppState>,
    handler: F,
) -> Result<Response<BoxBody>>
where
    F: FnOnce(Arc<AppState>, Principal) -> Fut,
    Fut: std::future::Future<Output = Result<Response<BoxBody>>>,
{
    let principal = authenticate(&state, req.headers()).await?;
    handler(state, principal).await
}
