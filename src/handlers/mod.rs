//! # Message Handlers
//!
//! A handler owns decode-and-act for one topic: it turns a raw payload into a
//! cluster API call. Handlers are selected by topic name in the
//! [`TopicHandlerRegistry`](crate::registry::TopicHandlerRegistry), never by
//! inspecting the payload.

pub mod create_deployment;

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::{ClusterClient, ClusterError};
use crate::models::CommandDecodeError;

pub use create_deployment::CreateDeploymentHandler;

/// Per-message failure. Terminal for that message only.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("decode failed: {0}")]
    Decode(#[from] CommandDecodeError),

    #[error("creation failed: {0}")]
    Creation(#[from] ClusterError),
}

impl HandlerError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Creation(_) => "creation",
        }
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Decode `payload` and act on it through `client`
    async fn handle(&self, client: &dyn ClusterClient, payload: &[u8]) -> Result<(), HandlerError>;

    /// Handler name for logs
    fn handler_name(&self) -> &str;
}
