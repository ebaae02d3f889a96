//! # Web Module
//!
//! Axum HTTP surface of the agent: `/ping` for process liveness and
//! `/healthz` for queue connectivity.
//!
//! - [`routes`] - route definitions
//! - [`handlers`] - request handlers
//! - [`state`] - shared handler state

pub mod handlers;
pub mod routes;
pub mod state;

use std::future::IntoFuture;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::shutdown::{CompletionSignal, ShutdownToken};
pub use state::AppState;

/// Build the router with all routes and state attached
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .with_state(app_state)
}

/// Serve `app_state` on `listener` until `shutdown` is cancelled.
///
/// After cancellation in-flight requests get `drain_timeout` to finish. The
/// completion signal fires once the server has stopped, whatever the outcome.
pub async fn serve(
    listener: TcpListener,
    app_state: AppState,
    shutdown: ShutdownToken,
    drain_timeout: Duration,
    completion: CompletionSignal,
) -> std::io::Result<()> {
    let local_addr = listener.local_addr().ok();
    info!(address = ?local_addr, "HTTP server started");

    let graceful = {
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    };
    let server = axum::serve(listener, create_app(app_state))
        .with_graceful_shutdown(graceful)
        .into_future();
    tokio::pin!(server);

    let drain_deadline = async {
        shutdown.cancelled().await;
        tokio::time::sleep(drain_timeout).await;
    };

    let result = tokio::select! {
        result = &mut server => result,
        _ = drain_deadline => {
            warn!(
                timeout_ms = drain_timeout.as_millis() as u64,
                "HTTP server did not drain in time, dropping open connections"
            );
            Ok(())
        }
    };

    match &result {
        Ok(()) => info!("HTTP server stopped"),
        Err(e) => warn!(error = %e, "HTTP server stopped with error"),
    }
    completion.complete();
    result
}
