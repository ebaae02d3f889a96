//! # Consumer Module
//!
//! Per-topic consumption loops.

pub mod topic_consumer;

pub use topic_consumer::{ConsumerStats, TopicConsumer};
