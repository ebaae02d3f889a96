//! # Agent Error Types
//!
//! Top-level error for startup and wiring. Per-message failures never reach
//! this type; they are logged by the consumption loop and the message is
//! dropped.

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PilotError {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
