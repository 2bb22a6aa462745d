//! `GET /api/statistics` - the latest snapshot

use hyper::{Method, Response, StatusCode};
use std::sync::Arc;

use super::{json_response, method_not_allowed, respond};
use crate::server::{AppState, BoxBody};

pub async fn handle_statistics(method: &Method, state: Arc<AppState>) -> Response<BoxBody> {
    if *method != Method::GET {
        return method_not_allowed();
    }
    respond(
        state
            .services
            .statistics
            .latest()
            .await
            .map(|snapshot| json_response(StatusCode::OK, &snapshot)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::server::Services;
    use crate::store::Stores;
    use clap::Parser;

    fn state() -> Arc<AppState> {
        let args = Args::parse_from(["peacemaking"]);
        let services = Services::build(Stores::memory(), &args).unwrap();
        Arc::new(AppState::new(args, services))
    }

    #[tokio::test]
    async fn test_statistics_only_answers_get() {
        let state = state();
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let response = handle_statistics(&method, state.clone()).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
        let response = handle_statistics(&Method::GET, state).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
