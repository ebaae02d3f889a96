//! # Health Probe
//!
//! Proves queue connectivity within a bounded time by pushing a heartbeat
//! through the dedicated health-check topic. Every call does a fresh
//! round-trip; results are never cached.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::messaging::QueueBackend;

#[derive(Clone)]
pub struct HealthProbe {
    backend: Arc<dyn QueueBackend>,
    topic: String,
    default_timeout: Duration,
}

impl HealthProbe {
    pub fn new(
        backend: Arc<dyn QueueBackend>,
        topic: impl Into<String>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            topic: topic.into(),
            default_timeout,
        }
    }

    /// Deadline used by the HTTP layer
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// `true` if a heartbeat round-trip completes before `timeout`
    pub async fn is_connected(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.backend.send_heartbeat(&self.topic)).await {
            Ok(Ok(())) => {
                debug!(topic = %self.topic, backend = self.backend.name(), "Heartbeat succeeded");
                true
            }
            Ok(Err(e)) => {
                warn!(
                    topic = %self.topic,
                    backend = self.backend.name(),
                    error = %e,
                    "Heartbeat failed"
                );
                false
            }
            Err(_) => {
                warn!(
                    topic = %self.topic,
                    backend = self.backend.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Heartbeat timed out"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProbe")
            .field("backend", &self.backend.name())
            .field("topic", &self.topic)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
