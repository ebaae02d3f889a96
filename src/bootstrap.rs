//! # Agent Bootstrap
//!
//! Wires configuration, queue backend, handler registry, consumption loops
//! and the HTTP server into a running agent.
//!
//! Startup order:
//! 1. Provision every subscribed topic and the health-check topic
//! 2. Bind the HTTP listener
//! 3. Open one reader per subscribed topic
//! 4. Spawn the consumption loops, then the HTTP server
//!
//! Any failure before step 4 aborts startup with nothing left running.
//! [`AgentHandle::shutdown`] runs the shutdown protocol: cancel, wait for every
//! loop and the server, then close the backend. Nothing is aborted.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cluster::ClusterClient;
use crate::config::AgentConfig;
use crate::consumer::{ConsumerStats, TopicConsumer};
use crate::error::{PilotError, Result};
use crate::health::HealthProbe;
use crate::logging::log_queue_operation;
use crate::messaging::{MessageSource, QueueBackend};
use crate::registry::TopicHandlerRegistry;
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::web::{self, AppState};

const HTTP_COMPONENT: &str = "http_server";

/// Entry point for starting the agent
pub struct AgentBootstrap;

impl AgentBootstrap {
    /// Start with the standard handlers for `config`
    pub async fn start(
        config: AgentConfig,
        backend: Arc<dyn QueueBackend>,
        client: Arc<dyn ClusterClient>,
    ) -> Result<AgentHandle> {
        let registry = TopicHandlerRegistry::from_config(&config)?;
        Self::start_with_registry(config, backend, client, registry).await
    }

    /// Start with a caller-built registry; one loop per registered topic
    pub async fn start_with_registry(
        config: AgentConfig,
        backend: Arc<dyn QueueBackend>,
        client: Arc<dyn ClusterClient>,
        registry: TopicHandlerRegistry,
    ) -> Result<AgentHandle> {
        config.validate()?;
        info!(
            backend = backend.name(),
            topics = ?registry.topics(),
            "🚀 BOOTSTRAP: Starting k8s pilot agent"
        );

        let config = Arc::new(config);
        let registry = Arc::new(registry);
        let topics = registry.topics();

        for topic in topics
            .iter()
            .chain(std::iter::once(&config.queue.health_check_topic))
        {
            backend.ensure_topic(topic).await?;
            log_queue_operation("ensure_topic", topic, "ready", None);
        }

        let listener = TcpListener::bind(&config.http.bind_address)
            .await
            .map_err(|e| {
                PilotError::startup(format!(
                    "failed to bind HTTP server on {}: {e}",
                    config.http.bind_address
                ))
            })?;
        let local_addr = listener.local_addr()?;

        let mut coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();

        let mut sources: Vec<Box<dyn MessageSource>> = Vec::with_capacity(topics.len());
        for topic in &topics {
            match backend.open_reader(topic, token.clone()).await {
                Ok(source) => sources.push(source),
                Err(e) => {
                    for mut source in sources {
                        if let Err(close_err) = source.close().await {
                            warn!(topic = %source.topic(), error = %close_err, "Failed to release reader");
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        let mut consumers = Vec::with_capacity(sources.len());
        for source in sources {
            let topic = source.topic().to_string();
            let consumer = TopicConsumer::new(
                source,
                Arc::clone(&registry),
                Arc::clone(&client),
                token.clone(),
                coordinator.register(format!("consumer:{topic}")),
            );
            consumers.push((topic, tokio::spawn(consumer.run())));
        }

        let probe = HealthProbe::new(
            Arc::clone(&backend),
            config.queue.health_check_topic.clone(),
            config.health.timeout(),
        );
        let server = tokio::spawn(web::serve(
            listener,
            AppState::new(probe),
            token,
            config.http.shutdown_timeout(),
            coordinator.register(HTTP_COMPONENT),
        ));

        info!(
            consumers = consumers.len(),
            http_address = %local_addr,
            "✅ BOOTSTRAP: Agent running"
        );

        Ok(AgentHandle {
            config,
            backend,
            coordinator,
            consumers,
            server,
            local_addr,
        })
    }
}

/// Outcome of [`AgentHandle::shutdown`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownSummary {
    pub report: ShutdownReport,
    /// Final counters of every loop that stopped, by topic
    pub consumer_stats: Vec<(String, ConsumerStats)>,
}

/// Handle to a running agent
pub struct AgentHandle {
    config: Arc<AgentConfig>,
    backend: Arc<dyn QueueBackend>,
    coordinator: ShutdownCoordinator,
    consumers: Vec<(String, JoinHandle<ConsumerStats>)>,
    server: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
}

impl AgentHandle {
    /// Address the HTTP server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Subscribed topics, one consumption loop each
    pub fn topics(&self) -> Vec<String> {
        self.consumers.iter().map(|(topic, _)| topic.clone()).collect()
    }

    /// Cancel everything, wait for every component, then release the backend.
    ///
    /// The grace period only bounds the coordinated wait: components still
    /// running after it are reported as `timed_out`, and their tasks are then
    /// joined anyway. A handler in progress is never interrupted, and the
    /// backend closes only after every reader has been released.
    pub async fn shutdown(self) -> ShutdownSummary {
        let grace = self.config.shutdown.grace_period();
        let report = self.coordinator.shutdown(grace).await;

        let mut consumer_stats = Vec::with_capacity(self.consumers.len());
        for (topic, task) in self.consumers {
            let component = format!("consumer:{topic}");
            if report.timed_out.contains(&component) {
                warn!(topic = %topic, "Consumer outlived grace period, waiting for in-flight message");
            }
            match task.await {
                Ok(stats) => consumer_stats.push((topic, stats)),
                Err(e) => error!(topic = %topic, error = %e, "Consumer task failed"),
            }
        }

        // Bounded by the server's own drain timeout
        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "HTTP server exited with error"),
            Err(e) => error!(error = %e, "HTTP server task failed"),
        }

        self.backend.close().await;
        info!(
            clean = report.is_clean(),
            backend = self.backend.name(),
            "🛑 Agent stopped, queue backend released"
        );

        ShutdownSummary {
            report,
            consumer_stats,
        }
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("backend", &self.backend.name())
            .field("topics", &self.topics())
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
