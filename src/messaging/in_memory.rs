//! # In-Process Queue Backend
//!
//! Channel-backed [`QueueBackend`] with the same delivery contract as pgmq:
//! in-order, at-most-once, one reader per topic. Used for local runs and by
//! the test suite, which also uses its fault hooks to simulate read failures
//! and a slow or failing broker.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::errors::{MessagingError, MessagingResult};
use super::message::QueueMessage;
use super::source::{MessageSource, QueueBackend};
use crate::shutdown::ShutdownToken;

#[derive(Debug)]
enum Delivery {
    Message(QueueMessage),
    Failure(String),
}

#[derive(Debug)]
struct TopicChannel {
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl TopicChannel {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    topics: Mutex<HashMap<String, TopicChannel>>,
    released_readers: Mutex<HashSet<String>>,
    released_at_close: Mutex<Option<HashSet<String>>>,
    next_msg_id: AtomicI64,
    heartbeat_delay: Mutex<Option<Duration>>,
    heartbeat_failing: AtomicBool,
    heartbeats: AtomicU64,
    delivered: AtomicU64,
    closed: AtomicBool,
}

/// In-process queue backend
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<InMemoryState>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, topic: &str) -> MessagingResult<mpsc::UnboundedSender<Delivery>> {
        if self.state.closed.load(Ordering::Acquire) {
            return Err(MessagingError::source_closed(topic));
        }
        let mut topics = self.state.topics.lock();
        Ok(topics
            .entry(topic.to_string())
            .or_insert_with(TopicChannel::new)
            .sender
            .clone())
    }

    /// Enqueue a raw payload, returning its message id
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> MessagingResult<i64> {
        let msg_id = self.state.next_msg_id.fetch_add(1, Ordering::AcqRel) + 1;
        let message = QueueMessage::new(topic, msg_id, payload.into());
        self.sender_for(topic)?
            .send(Delivery::Message(message))
            .map_err(|_| MessagingError::source_closed(topic))?;
        Ok(msg_id)
    }

    /// Serialize `message` as JSON and enqueue it
    pub fn publish_json<T: serde::Serialize>(
        &self,
        topic: &str,
        message: &T,
    ) -> MessagingResult<i64> {
        let payload = serde_json::to_vec(message)?;
        self.publish(topic, payload)
    }

    /// Make the reader's next read on `topic` fail with a queue error
    pub fn fail_next_read(&self, topic: &str, reason: impl Into<String>) -> MessagingResult<()> {
        self.sender_for(topic)?
            .send(Delivery::Failure(reason.into()))
            .map_err(|_| MessagingError::source_closed(topic))
    }

    /// Delay every heartbeat by `delay`; `None` answers immediately
    pub fn set_heartbeat_delay(&self, delay: Option<Duration>) {
        *self.state.heartbeat_delay.lock() = delay;
    }

    /// Make heartbeats fail outright
    pub fn set_heartbeat_failing(&self, failing: bool) {
        self.state.heartbeat_failing.store(failing, Ordering::Release);
    }

    /// Number of heartbeats that completed successfully
    pub fn heartbeat_count(&self) -> u64 {
        self.state.heartbeats.load(Ordering::Acquire)
    }

    /// Number of messages handed out to readers, across all topics
    pub fn delivered_count(&self) -> u64 {
        self.state.delivered.load(Ordering::Acquire)
    }

    /// Whether the reader for `topic` has been closed
    pub fn is_reader_released(&self, topic: &str) -> bool {
        self.state.released_readers.lock().contains(topic)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Whether the reader for `topic` had been released when the backend
    /// was first closed; `false` if the backend is still open
    pub fn was_released_before_close(&self, topic: &str) -> bool {
        self.state
            .released_at_close
            .lock()
            .as_ref()
            .is_some_and(|released| released.contains(topic))
    }
}

#[async_trait]
impl QueueBackend for InMemoryQueue {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn ensure_topic(&self, topic: &str) -> MessagingResult<()> {
        self.sender_for(topic).map(|_| ())
    }

    async fn open_reader(
        &self,
        topic: &str,
        shutdown: ShutdownToken,
    ) -> MessagingResult<Box<dyn MessageSource>> {
        if self.is_closed() {
            return Err(MessagingError::source_closed(topic));
        }

        let receiver = {
            let mut topics = self.state.topics.lock();
            let channel = topics
                .entry(topic.to_string())
                .or_insert_with(TopicChannel::new);
            channel.receiver.take().ok_or_else(|| {
                MessagingError::queue_operation(topic, "open_reader", "topic already has a reader")
            })?
        };

        Ok(Box::new(InMemoryTopicReader {
            topic: topic.to_string(),
            receiver: Some(receiver),
            shutdown,
            state: Arc::clone(&self.state),
        }))
    }

    async fn send_heartbeat(&self, topic: &str) -> MessagingResult<()> {
        if self.is_closed() {
            return Err(MessagingError::source_closed(topic));
        }

        let delay = *self.state.heartbeat_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.heartbeat_failing.load(Ordering::Acquire) {
            return Err(MessagingError::queue_operation(
                topic,
                "send",
                "broker rejected heartbeat",
            ));
        }

        self.state.heartbeats.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn close(&self) {
        {
            let mut snapshot = self.state.released_at_close.lock();
            if snapshot.is_none() {
                *snapshot = Some(self.state.released_readers.lock().clone());
            }
        }
        self.state.closed.store(true, Ordering::Release);
        debug!("In-memory queue closed");
    }
}

/// Reader over one in-process topic
#[derive(Debug)]
pub struct InMemoryTopicReader {
    topic: String,
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
    shutdown: ShutdownToken,
    state: Arc<InMemoryState>,
}

#[async_trait]
impl MessageSource for InMemoryTopicReader {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_message(&mut self) -> MessagingResult<QueueMessage> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(MessagingError::source_closed(&self.topic));
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(MessagingError::source_closed(&self.topic)),
            delivery = receiver.recv() => match delivery {
                Some(Delivery::Message(message)) => {
                    self.state.delivered.fetch_add(1, Ordering::AcqRel);
                    Ok(message)
                }
                Some(Delivery::Failure(reason)) => {
                    Err(MessagingError::queue_operation(&self.topic, "read", reason))
                }
                None => Err(MessagingError::source_closed(&self.topic)),
            },
        }
    }

    async fn close(&mut self) -> MessagingResult<()> {
        if self.receiver.take().is_some() {
            self.state.released_readers.lock().insert(self.topic.clone());
            debug!(topic = %self.topic, "In-memory reader released");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}
