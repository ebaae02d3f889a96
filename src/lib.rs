#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, pgmq in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # k8s Pilot Agent
//!
//! Queue-driven Kubernetes deployment agent. Deployment commands arrive as
//! JSON messages on PostgreSQL message queue (pgmq) topics; each one is
//! turned into a single-replica `Deployment` and submitted to the cluster.
//!
//! ## Module Organization
//!
//! - [`models`] - deploy command wire schema
//! - [`cluster`] - deployment spec builder and cluster client
//! - [`handlers`] - per-topic message handlers
//! - [`registry`] - topic -> handler dispatch table
//! - [`messaging`] - queue backends and per-topic readers
//! - [`consumer`] - per-topic consumption loops
//! - [`health`] - queue connectivity probe
//! - [`shutdown`] - cancellation token and completion signals
//! - [`web`] - `/ping` and `/healthz`
//! - [`bootstrap`] - wiring and lifecycle
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - top-level error type
//!
//! ## Delivery
//!
//! Messages are popped (read and deleted in one step), so delivery is
//! at-most-once. A message that fails to decode or to create is logged and
//! dropped; the loop keeps going.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pilot_agent::bootstrap::AgentBootstrap;
//! use pilot_agent::cluster::KubeClusterClient;
//! use pilot_agent::config::ConfigLoader;
//! use pilot_agent::messaging::PgmqBackend;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::from_process_env().load()?;
//! let backend = PgmqBackend::connect(&config.queue).await?;
//! let client = KubeClusterClient::try_default().await?;
//!
//! let agent = AgentBootstrap::start(config, Arc::new(backend), Arc::new(client)).await?;
//! tokio::signal::ctrl_c().await?;
//! let summary = agent.shutdown().await;
//! assert!(summary.report.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod registry;
pub mod shutdown;
pub mod web;

pub use bootstrap::{AgentBootstrap, AgentHandle, ShutdownSummary};
pub use cluster::{build_deployment, ClusterClient, KubeClusterClient};
pub use config::{AgentConfig, ConfigLoader};
pub use consumer::{ConsumerStats, TopicConsumer};
pub use error::{PilotError, Result};
pub use handlers::{CreateDeploymentHandler, HandlerError, MessageHandler};
pub use health::HealthProbe;
pub use messaging::{InMemoryQueue, MessageSource, PgmqBackend, QueueBackend};
pub use models::DeployCommand;
pub use registry::{RegistryError, TopicHandlerRegistry};
pub use shutdown::{CompletionSignal, ShutdownCoordinator, ShutdownReport, ShutdownToken};
