//! # Queue Messages
//!
//! The unit a [`MessageSource`](super::MessageSource) yields: the raw payload
//! plus the queue bookkeeping needed for logging. Payload interpretation is
//! left entirely to the topic's handler.

use chrono::{DateTime, Utc};

/// A message popped from a topic
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Topic (queue name) the message was read from
    pub topic: String,
    /// Queue-assigned message id
    pub msg_id: i64,
    /// How many times the queue has handed this message out
    pub read_count: i32,
    /// When the message was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Raw payload bytes
    pub payload: Vec<u8>,
}

impl QueueMessage {
    pub fn new(topic: impl Into<String>, msg_id: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            msg_id,
            read_count: 1,
            enqueued_at: Utc::now(),
            payload,
        }
    }

    /// Build a message from a pgmq row, re-encoding the jsonb body to bytes
    pub fn from_pgmq(
        topic: &str,
        message: pgmq::types::Message<serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(&message.message)?;
        Ok(Self {
            topic: topic.to_string(),
            msg_id: message.msg_id,
            read_count: message.read_ct,
            enqueued_at: message.enqueued_at,
            payload,
        })
    }

    /// Lossy UTF-8 view of the payload, for log lines
    pub fn payload_preview(&self, max_len: usize) -> String {
        let text = String::from_utf8_lossy(&self.payload);
        if text.chars().count() <= max_len {
            text.into_owned()
        } else {
            let truncated: String = text.chars().take(max_len).collect();
            format!("{truncated}...")
        }
    }
}
