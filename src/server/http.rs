//! HTTP server
//!
//! One hyper http1 connection per accepted socket, upgrades enabled for the
//! notification WebSocket. Every request runs under the configured deadline;
//! dropping the handler future on expiry cancels whatever it was awaiting.

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::routes;
use crate::server::Services;
use crate::types::Result;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub services: Services,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, services: Services) -> Self {
        Self {
            args,
            services,
            started_at: Instant::now(),
        }
    }
}

/// Accept connections until the listener fails to bind
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Proof of Peacemaking listening on {} (storage: {})",
        state.args.listen, state.services.storage
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    let deadline = state.args.request_timeout();
    match tokio::time::timeout(deadline, route(state, req, &path)).await {
        Ok(response) => Ok(response),
        Err(_) => {
            warn!(method = %method, path = %path, "Request deadline exceeded");
            Ok(routes::json_response(
                StatusCode::GATEWAY_TIMEOUT,
                &serde_json::json!({
                    "error": "Timeout",
                    "message": "request deadline exceeded",
                }),
            ))
        }
    }
}

async fn route(state: Arc<AppState>, req: Request<Incoming>, path: &str) -> Response<BoxBody> {
    match path {
        "/health" | "/healthz" => routes::health_check(&state),
        p if p.starts_with("/auth/") => routes::handle_auth_request(req, state).await,
        p if p.starts_with("/webauthn/") => routes::handle_webauthn_request(req, state).await,
        p if p.starts_with("/api/notifications") => {
            routes::handle_notification_request(req, state).await
        }
        p if p.starts_with("/api/expressions")
            || p.starts_with("/api/acknowledgements")
            || p.starts_with("/api/proofs") =>
        {
            routes::handle_interaction_request(req, state).await
        }
        p if p.starts_with("/api/conversations") => {
            routes::handle_conversation_request(req, state).await
        }
        p if p.starts_with("/api/account") => routes::handle_account_request(req, state).await,
        "/api/statistics" => routes::handle_statistics(req.method(), state).await,
        _ => routes::not_found(path),
    }
}
