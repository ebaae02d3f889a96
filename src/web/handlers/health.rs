//! # Health Check Handlers
//!
//! Kubernetes-compatible liveness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use tracing::debug;

use crate::web::state::AppState;

pub const HEALTHY_BODY: &str = "OK";
pub const UNHEALTHY_BODY: &str = "queue connection failed";

/// Process liveness: GET /ping
///
/// Always answers, even while shutting down.
pub async fn ping() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTHY_BODY)
}

/// Queue connectivity: GET /healthz
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    debug!("Performing queue connectivity check");

    let timeout = state.probe.default_timeout();
    if state.probe.is_connected(timeout).await {
        (StatusCode::OK, HEALTHY_BODY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, UNHEALTHY_BODY)
    }
}
