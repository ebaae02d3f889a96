//! # Registry Module
//!
//! Topic-to-handler dispatch table.

pub mod topic_handler_registry;

pub use topic_handler_registry::{RegistryError, TopicHandlerRegistry};
