//! # Messaging Module
//!
//! Queue access for the agent. Topics are PostgreSQL message queue (pgmq)
//! queues; an in-process backend with the same contract is available for
//! local runs and tests.

pub mod errors;
pub mod in_memory;
pub mod message;
pub mod pgmq_client;
pub mod source;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryQueue;
pub use message::QueueMessage;
pub use pgmq_client::{PgmqBackend, PgmqTopicReader};
pub use source::{MessageSource, QueueBackend};
