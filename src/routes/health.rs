//! Liveness probe
//!
//! `/health` and `/healthz` return 200 while the process is serving, along
//! with the storage backend in use.

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::{AppState, BoxBody};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// "mongodb" or "memory"
    pub storage: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            storage: state.services.storage,
            uptime: state.started_at.elapsed().as_secs(),
        },
    )
}
