//! # Topic Handler Registry
//!
//! Fixed topic -> handler mapping. Built once before any consumption loop
//! starts, then shared read-only behind an `Arc`, so lookups take no lock.
//!
//! ## Usage
//!
//! ```rust
//! use pilot_agent::handlers::CreateDeploymentHandler;
//! use pilot_agent::registry::TopicHandlerRegistry;
//! use std::sync::Arc;
//!
//! let mut registry = TopicHandlerRegistry::new();
//! registry
//!     .register("deploy_commands", Arc::new(CreateDeploymentHandler::new()))
//!     .unwrap();
//!
//! assert!(registry.lookup("deploy_commands").is_some());
//! assert!(registry.lookup("unknown").is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::AgentConfig;
use crate::handlers::{CreateDeploymentHandler, MessageHandler};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a handler is already registered for topic {topic}")]
    DuplicateTopic { topic: String },

    #[error("topic name must not be empty")]
    EmptyTopic,
}

#[derive(Default)]
pub struct TopicHandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl TopicHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the agent's standard handlers for `config`
    pub fn from_config(config: &AgentConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(
            config.queue.create_deploy_topic.clone(),
            Arc::new(CreateDeploymentHandler::new()),
        )?;
        Ok(registry)
    }

    /// Register the single handler for `topic`
    pub fn register(
        &mut self,
        topic: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), RegistryError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(RegistryError::EmptyTopic);
        }
        if self.handlers.contains_key(&topic) {
            return Err(RegistryError::DuplicateTopic { topic });
        }

        info!(topic = %topic, handler = %handler.handler_name(), "Registered topic handler");
        self.handlers.insert(topic, handler);
        Ok(())
    }

    pub fn lookup(&self, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(topic).cloned()
    }

    /// Registered topics, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for TopicHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicHandlerRegistry")
            .field("topics", &self.topics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;

    #[test]
    fn test_duplicate_topic_is_rejected() {
        let mut registry = TopicHandlerRegistry::new();
        registry
            .register("deploy_commands", Arc::new(CreateDeploymentHandler::new()))
            .unwrap();

        let err = registry
            .register("deploy_commands", Arc::new(CreateDeploymentHandler::new()))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTopic {
                topic: "deploy_commands".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_topic_is_rejected() {
        let mut registry = TopicHandlerRegistry::new();
        let err = registry
            .register(" ", Arc::new(CreateDeploymentHandler::new()))
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyTopic);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_config_registers_deploy_topic() {
        let config = AgentConfig {
            queue: QueueConfig {
                create_deploy_topic: "deploy_commands".to_string(),
                ..QueueConfig::default()
            },
            ..AgentConfig::default()
        };
        let registry = TopicHandlerRegistry::from_config(&config).unwrap();

        assert_eq!(registry.topics(), vec!["deploy_commands"]);
        let handler = registry.lookup("deploy_commands").unwrap();
        assert_eq!(handler.handler_name(), "create_deployment");
        assert!(registry.lookup(&config.queue.health_check_topic).is_none());
    }
}
