//! Pilot Agent Binary
//!
//! Loads configuration, connects to the cluster and the queue, runs the
//! consumption loops and the liveness server until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use pilot_agent::bootstrap::AgentBootstrap;
use pilot_agent::cluster::KubeClusterClient;
use pilot_agent::config::ConfigLoader;
use pilot_agent::logging;
use pilot_agent::messaging::{InMemoryQueue, PgmqBackend, QueueBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    let config = ConfigLoader::from_process_env()
        .load()
        .context("failed to load configuration")?;

    let client = KubeClusterClient::try_default()
        .await
        .context("failed to initialize Kubernetes client")?;

    let backend: Arc<dyn QueueBackend> = if config.queue.uses_in_memory_backend() {
        warn!("Using in-process queue backend, messages are not durable");
        Arc::new(InMemoryQueue::new())
    } else {
        let backend = PgmqBackend::connect(&config.queue)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to queue broker at {}",
                    config.queue.redacted_broker_url()
                )
            })?;
        Arc::new(backend)
    };

    let agent = AgentBootstrap::start(config, backend, Arc::new(client))
        .await
        .context("failed to start agent")?;

    wait_for_termination().await?;
    info!("Termination requested, shutting down");

    let summary = agent.shutdown().await;
    if !summary.report.is_clean() {
        warn!(
            abandoned = ?summary.report.abandoned,
            timed_out = ?summary.report.timed_out,
            "Shutdown finished with components that did not stop cleanly"
        );
    }
    info!("Agent exited");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}
