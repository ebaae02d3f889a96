//! # Message Source Traits
//!
//! Seams between the consumption loop and the queue backend.
//!
//! A [`MessageSource`] is a per-topic reader whose `next_message` blocks until
//! a message arrives. Sources watch the shutdown token while they wait: once
//! cancellation is requested a pending read returns
//! [`MessagingError::SourceClosed`], which is what lets a loop leave an idle
//! wait. A flag alone could not unblock it.

use async_trait::async_trait;

use super::errors::MessagingResult;
use super::message::QueueMessage;
use crate::shutdown::ShutdownToken;

/// Blocking per-topic reader
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Topic this source reads from
    fn topic(&self) -> &str;

    /// Wait for the next message on the topic
    async fn next_message(&mut self) -> MessagingResult<QueueMessage>;

    /// Release the reader; later reads fail with `SourceClosed`
    async fn close(&mut self) -> MessagingResult<()>;

    fn is_closed(&self) -> bool;
}

/// Queue backend: opens readers, proves connectivity, owns the connection
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Create the topic if it does not exist yet
    async fn ensure_topic(&self, topic: &str) -> MessagingResult<()>;

    /// Open a reader bound to `shutdown`
    async fn open_reader(
        &self,
        topic: &str,
        shutdown: ShutdownToken,
    ) -> MessagingResult<Box<dyn MessageSource>>;

    /// Write-then-remove a zero-content heartbeat on `topic`
    async fn send_heartbeat(&self, topic: &str) -> MessagingResult<()>;

    /// Release the underlying connection resources
    async fn close(&self);
}
