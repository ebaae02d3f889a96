//! # PostgreSQL Message Queue Backend (pgmq-rs)
//!
//! Topics are pgmq queues. Readers use `pop`, which reads and deletes a
//! message in one statement: a message is handed out at most once, and a
//! crash mid-handler loses it rather than replaying it.
//!
//! pgmq has no blocking read, so an idle reader polls at `poll_interval`
//! and races each sleep against the shutdown token.

use async_trait::async_trait;
use pgmq::PGMQueue;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::{MessagingError, MessagingResult};
use super::message::QueueMessage;
use super::source::{MessageSource, QueueBackend};
use crate::config::QueueConfig;
use crate::shutdown::ShutdownToken;

/// pgmq-backed queue backend sharing one connection pool across topics
#[derive(Debug, Clone)]
pub struct PgmqBackend {
    pgmq: PGMQueue,
    poll_interval: Duration,
}

impl PgmqBackend {
    /// Connect to the broker database described by `config`
    pub async fn connect(config: &QueueConfig) -> MessagingResult<Self> {
        info!(
            max_connections = config.max_connections,
            "🚀 Connecting to pgmq broker"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.broker_url)
            .await?;

        let pgmq = PGMQueue::new_with_pool(pool).await;

        info!("✅ Connected to pgmq broker");
        Ok(Self {
            pgmq,
            poll_interval: config.poll_interval(),
        })
    }

    /// Build a backend around an existing pool (BYOP - Bring Your Own Pool)
    pub async fn with_pool(pool: sqlx::PgPool, poll_interval: Duration) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self {
            pgmq,
            poll_interval,
        }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }
}

#[async_trait]
impl QueueBackend for PgmqBackend {
    fn name(&self) -> &'static str {
        "pgmq"
    }

    async fn ensure_topic(&self, topic: &str) -> MessagingResult<()> {
        debug!(topic = %topic, "📋 Ensuring queue exists");
        self.pgmq
            .create(topic)
            .await
            .map_err(|e| MessagingError::queue_operation(topic, "create", e.to_string()))?;
        info!(topic = %topic, "✅ Queue ready");
        Ok(())
    }

    async fn open_reader(
        &self,
        topic: &str,
        shutdown: ShutdownToken,
    ) -> MessagingResult<Box<dyn MessageSource>> {
        if self.pool().is_closed() {
            return Err(MessagingError::source_closed(topic));
        }
        Ok(Box::new(PgmqTopicReader {
            pgmq: self.pgmq.clone(),
            topic: topic.to_string(),
            poll_interval: self.poll_interval,
            shutdown,
            closed: false,
        }))
    }

    async fn send_heartbeat(&self, topic: &str) -> MessagingResult<()> {
        // Detached so the delete still runs when the caller stops waiting
        // between send and delete; otherwise the row would stay in the queue.
        let round_trip = tokio::spawn(heartbeat_round_trip(
            self.pgmq.clone(),
            topic.to_string(),
        ));

        round_trip
            .await
            .map_err(|e| MessagingError::queue_operation(topic, "heartbeat", e.to_string()))?
    }

    async fn close(&self) {
        if !self.pool().is_closed() {
            info!("Closing pgmq connection pool");
            self.pgmq.connection.close().await;
        }
    }
}

async fn heartbeat_round_trip(pgmq: PGMQueue, topic: String) -> MessagingResult<()> {
    let msg_id = pgmq
        .send(&topic, &serde_json::json!({}))
        .await
        .map_err(|e| MessagingError::queue_operation(&topic, "send", e.to_string()))?;

    pgmq.delete(&topic, msg_id)
        .await
        .map_err(|e| MessagingError::queue_operation(&topic, "delete", e.to_string()))?;

    debug!(topic = %topic, msg_id, "💓 Heartbeat round-trip complete");
    Ok(())
}

/// Polling reader for a single pgmq queue
#[derive(Debug)]
pub struct PgmqTopicReader {
    pgmq: PGMQueue,
    topic: String,
    poll_interval: Duration,
    shutdown: ShutdownToken,
    closed: bool,
}

#[async_trait]
impl MessageSource for PgmqTopicReader {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_message(&mut self) -> MessagingResult<QueueMessage> {
        loop {
            if self.closed || self.shutdown.is_cancelled() {
                return Err(MessagingError::source_closed(&self.topic));
            }

            let popped = self
                .pgmq
                .pop::<serde_json::Value>(&self.topic)
                .await
                .map_err(|e| MessagingError::queue_operation(&self.topic, "pop", e.to_string()))?;

            match popped {
                Some(message) => {
                    return QueueMessage::from_pgmq(&self.topic, message).map_err(|e| {
                        warn!(topic = %self.topic, error = %e, "Failed to re-encode popped message");
                        MessagingError::from(e)
                    });
                }
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = self.shutdown.cancelled() => {
                            debug!(topic = %self.topic, "Shutdown observed while waiting for messages");
                            return Err(MessagingError::source_closed(&self.topic));
                        }
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> MessagingResult<()> {
        if !self.closed {
            debug!(topic = %self.topic, "Releasing pgmq reader");
            self.closed = true;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
