//! # Topic Consumer
//!
//! One long-running loop per topic. The loop reads a message, dispatches it to
//! the handler registered for the topic and moves on; every per-message
//! failure is logged and swallowed so the loop only ever stops on
//! cancellation.
//!
//! ## Lifecycle
//!
//! ```text
//! Running --(token cancelled at iteration top)--------------> Stopped
//! Running --(read fails while token is cancelled)-----------> Stopped
//! Stopped: source.close() awaited, then completion signal fired
//! ```

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cluster::ClusterClient;
use crate::messaging::{MessageSource, QueueMessage};
use crate::registry::TopicHandlerRegistry;
use crate::shutdown::{CompletionSignal, ShutdownToken};

/// Per-loop counters, returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Messages a handler completed successfully
    pub processed: u64,
    /// Messages whose handler returned an error
    pub failed: u64,
    /// Messages on a topic with no registered handler
    pub unhandled: u64,
    /// Failed reads that were retried
    pub read_errors: u64,
}

/// Consumption loop for a single topic
pub struct TopicConsumer {
    consumer_id: Uuid,
    topic: String,
    source: Box<dyn MessageSource>,
    registry: Arc<TopicHandlerRegistry>,
    client: Arc<dyn ClusterClient>,
    shutdown: ShutdownToken,
    completion: CompletionSignal,
}

impl TopicConsumer {
    pub fn new(
        source: Box<dyn MessageSource>,
        registry: Arc<TopicHandlerRegistry>,
        client: Arc<dyn ClusterClient>,
        shutdown: ShutdownToken,
        completion: CompletionSignal,
    ) -> Self {
        Self {
            consumer_id: Uuid::new_v4(),
            topic: source.topic().to_string(),
            source,
            registry,
            client,
            shutdown,
            completion,
        }
    }

    /// Run until cancelled, then release the source and fire the completion
    /// signal. The source is always closed before the signal fires.
    pub async fn run(mut self) -> ConsumerStats {
        info!(
            consumer_id = %self.consumer_id,
            topic = %self.topic,
            "Starting topic consumer"
        );

        let mut stats = ConsumerStats::default();

        loop {
            if self.shutdown.is_cancelled() {
                debug!(topic = %self.topic, "Cancellation observed at iteration start");
                break;
            }

            let message = match self.source.next_message().await {
                Ok(message) => message,
                Err(e) => {
                    if self.shutdown.is_cancelled() {
                        debug!(topic = %self.topic, error = %e, "Read ended by cancellation");
                        break;
                    }
                    stats.read_errors += 1;
                    warn!(
                        consumer_id = %self.consumer_id,
                        topic = %self.topic,
                        error = %e,
                        "Failed to read message, retrying"
                    );
                    // Unbounded immediate retry; yield so a dead source
                    // cannot starve the runtime.
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            self.dispatch(&message, &mut stats).await;
        }

        self.stop(stats).await
    }

    async fn dispatch(&self, message: &QueueMessage, stats: &mut ConsumerStats) {
        info!(
            topic = %message.topic,
            msg_id = message.msg_id,
            payload_bytes = message.payload.len(),
            "Received message"
        );

        let Some(handler) = self.registry.lookup(&message.topic) else {
            stats.unhandled += 1;
            warn!(
                topic = %message.topic,
                msg_id = message.msg_id,
                "No handler registered for topic, dropping message"
            );
            return;
        };

        match handler.handle(self.client.as_ref(), &message.payload).await {
            Ok(()) => {
                stats.processed += 1;
                debug!(
                    topic = %message.topic,
                    msg_id = message.msg_id,
                    handler = %handler.handler_name(),
                    "Message handled"
                );
            }
            Err(e) => {
                stats.failed += 1;
                error!(
                    topic = %message.topic,
                    msg_id = message.msg_id,
                    handler = %handler.handler_name(),
                    kind = e.kind(),
                    error = %e,
                    payload = %message.payload_preview(256),
                    "Message handling failed"
                );
            }
        }
    }

    async fn stop(mut self, stats: ConsumerStats) -> ConsumerStats {
        if let Err(e) = self.source.close().await {
            warn!(topic = %self.topic, error = %e, "Failed to close message source");
        }

        info!(
            consumer_id = %self.consumer_id,
            topic = %self.topic,
            processed = stats.processed,
            failed = stats.failed,
            unhandled = stats.unhandled,
            read_errors = stats.read_errors,
            "Topic consumer stopped"
        );

        self.completion.complete();
        stats
    }
}

impl std::fmt::Debug for TopicConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicConsumer")
            .field("consumer_id", &self.consumer_id)
            .field("topic", &self.topic)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterError, ClusterResult};
    use crate::handlers::CreateDeploymentHandler;
    use crate::messaging::{InMemoryQueue, QueueBackend};
    use crate::shutdown::ShutdownCoordinator;
    use async_trait::async_trait;
    use k8s_openapi::api::apps::v1::Deployment;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct NamespaceRecorder {
        namespaces: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClusterClient for NamespaceRecorder {
        async fn create_deployment(
            &self,
            namespace: &str,
            deployment: Deployment,
        ) -> ClusterResult<()> {
            if namespace == "forbidden" {
                return Err(ClusterError::create_failed(
                    namespace,
                    deployment.metadata.name.unwrap_or_default(),
                    "forbidden",
                ));
            }
            self.namespaces.lock().push(namespace.to_string());
            Ok(())
        }
    }

    fn registry_for(topic: &str) -> Arc<TopicHandlerRegistry> {
        let mut registry = TopicHandlerRegistry::new();
        registry
            .register(topic, Arc::new(CreateDeploymentHandler::new()))
            .unwrap();
        Arc::new(registry)
    }

    fn command(namespace: &str) -> Vec<u8> {
        format!(
            r#"{{"deployName":"web","namespace":"{namespace}","containerSpec":{{"image":"nginx","port":80}}}}"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reads_nothing() {
        let queue = InMemoryQueue::new();
        let mut coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let source = queue.open_reader("deploy", token.clone()).await.unwrap();
        queue.publish("deploy", command("default")).unwrap();

        let client = Arc::new(NamespaceRecorder::default());
        let consumer = TopicConsumer::new(
            source,
            registry_for("deploy"),
            client.clone(),
            token.clone(),
            coordinator.register("deploy"),
        );
        token.cancel();

        let stats = consumer.run().await;
        assert_eq!(stats, ConsumerStats::default());
        assert!(client.namespaces.lock().is_empty());
        assert!(queue.is_reader_released("deploy"));
        assert!(coordinator.shutdown(None).await.is_clean());
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_loop() {
        let queue = InMemoryQueue::new();
        let mut coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let source = queue.open_reader("deploy", token.clone()).await.unwrap();

        queue.publish("deploy", command("forbidden")).unwrap();
        queue.publish("deploy", b"{broken".to_vec()).unwrap();
        queue.publish("deploy", command("default")).unwrap();

        let client = Arc::new(NamespaceRecorder::default());
        let consumer = TopicConsumer::new(
            source,
            registry_for("deploy"),
            client.clone(),
            token.clone(),
            coordinator.register("deploy"),
        );
        let handle = tokio::spawn(consumer.run());

        tokio::time::timeout(Duration::from_secs(2), async {
            while client.namespaces.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("valid command should be processed");

        let report = coordinator.shutdown(Some(Duration::from_secs(2))).await;
        let stats = handle.await.unwrap();

        assert!(report.is_clean());
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(*client.namespaces.lock(), vec!["default"]);
    }
}
