//! Expression, acknowledgement and proof routes
//!
//! Every route here requires an auth session.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    authenticate, json_response, method_not_allowed, not_found, parse_json_body, parse_query,
    respond, segments,
};
use crate::domain::{ContentMap, Principal};
use crate::interaction::NewExpression;
use crate::server::{AppState, BoxBody};
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmExpressionRequest {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    on_chain_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewAcknowledgementRequest {
    expression_id: String,
    content: ContentMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequestBody {
    expression_id: String,
    acknowledgement_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintedRequest {
    token_id: i64,
    hash: String,
}

// =============================================================================
// Expressions
// =============================================================================

async fn list_expressions(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let query: ListQuery = parse_query(&req)?;
    let entries = state.services.interaction.list_expressions(query.limit).await?;
    Ok(json_response(StatusCode::OK, &entries))
}

async fn create_expression(
    req: Request<Incoming>,
    state: Arc<AppState>,
    principal: Principal,
) -> Result<Response<BoxBody>> {
    let input: NewExpression = parse_json_body(req).await?;
    let expression = state
        .services
        .interaction
        .create_expression(&principal, input)
        .await?;
    Ok(json_response(StatusCode::CREATED, &expression))
}

async fn confirm_expression(
    req: Request<Incoming>,
    state: Arc<AppState>,
    principal: Principal,
    id: &str,
) -> Result<Response<BoxBody>> {
    let body: ConfirmExpressionRequest = parse_json_body(req).await?;
    let expression = state
        .services
        .interaction
        .confirm_expression(&principal, id, body.hash, body.on_chain_id)
        .await?;
    Ok(json_response(StatusCode::OK, &expression))
}

// =============================================================================
// Acknowledgements
// =============================================================================

async fn create_acknowledgement(
    req: Request<Incoming>,
    state: Arc<AppState>,
    principal: Principal,
) -> Result<Response<BoxBody>> {
    let body: NewAcknowledgementRequest = parse_json_body(req).await?;
    let acknowledgement = state
        .services
        .interaction
        .create_acknowledgement(&principal, &body.expression_id, body.content)
        .await?;
    Ok(json_response(StatusCode::CREATED, &acknowledgement))
}

// =============================================================================
// Proofs
// =============================================================================

async fn request_proof(
    req: Request<Incoming>,
    state: Arc<AppState>,
    principal: Principal,
) -> Result<Response<BoxBody>> {
    let body: ProofRequestBody = parse_json_body(req).await?;
    let request = state
        .services
        .interaction
        .request_proof(&principal, &body.expression_id, &body.acknowledgement_id)
        .await?;
    Ok(json_response(StatusCode::OK, &request))
}

async fn mark_minted(
    req: Request<Incoming>,
    state: Arc<AppState>,
    principal: Principal,
    id: &str,
) -> Result<Response<BoxBody>> {
    let body: MintedRequest = parse_json_body(req).await?;
    let token = state
        .services
        .interaction
        .mark_minted(&principal, id, body.token_id, &body.hash)
        .await?;
    Ok(json_response(StatusCode::OK, &token))
}

pub async fn handle_interaction_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let principal = match authenticate(&state, req.headers()).await {
        Ok(principal) => principal,
        Err(e) => return respond(Err(e)),
    };
    let interaction = Arc::clone(&state.services.interaction);

    let result = match (&method, segments(&path).as_slice()) {
        (&Method::GET, ["api", "expressions"]) => list_expressions(req, state).await,
        (&Method::POST, ["api", "expressions"]) => create_expression(req, state, principal).await,
        (&Method::GET, ["api", "expressions", "user"]) => interaction
            .expressions_by_creator(&principal.user_id)
            .await
            .map(|entries| json_response(StatusCode::OK, &entries)),
        (&Method::GET, ["api", "expressions", id]) => interaction
            .get_expression(id)
            .await
            .map(|entry| json_response(StatusCode::OK, &entry)),
        (&Method::PUT, ["api", "expressions", id, "confirm"]) => {
            confirm_expression(req, state, principal, id).await
        }

        (&Method::POST, ["api", "acknowledgements"]) => {
            create_acknowledgement(req, state, principal).await
        }
        (&Method::PUT, ["api", "acknowledgements", id, "refute"]) => interaction
            .refute_acknowledgement(&principal, id)
            .await
            .map(|ack| json_response(StatusCode::OK, &ack)),

        (&Method::POST, ["api", "proofs", "request"]) => request_proof(req, state, principal).await,
        (&Method::PUT, ["api", "proofs", "approve", id]) => interaction
            .approve_proof(&principal, id)
            .await
            .map(|token| json_response(StatusCode::OK, &token)),
        (&Method::PUT, ["api", "proofs", "reject", id]) => interaction
            .reject_proof(&principal, id)
            .await
            .map(|request| json_response(StatusCode::OK, &request)),
        (&Method::PUT, ["api", "proofs", "minted", id]) => {
            mark_minted(req, state, principal, id).await
        }
        (&Method::GET, ["api", "proofs", "user"]) => interaction
            .proofs_for_user(&principal.user_id)
            .await
            .map(|tokens| json_response(StatusCode::OK, &tokens)),
        (&Method::GET, ["api", "proofs", "requests"]) => interaction
            .requests_for_user(&principal.user_id)
            .await
            .map(|requests| json_response(StatusCode::OK, &requests)),

        (_, ["api", "expressions" | "acknowledgements" | "proofs", ..]) => {
            Ok(method_not_allowed())
        }
        _ => Ok(not_found(&path)),
    };

    respond(result)
}
