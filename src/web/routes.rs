//! # Route Definitions

use axum::routing::get;
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// Liveness routes, never authenticated
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/healthz", get(handlers::health::healthz))
}
