//! Test builders: deploy command payloads, a recording cluster client and
//! agent configuration pointed at local addresses.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pilot_agent::cluster::{ClusterClient, ClusterError, ClusterResult};
use pilot_agent::config::{AgentConfig, QueueConfig, ShutdownConfig};

pub const DEPLOY_TOPIC: &str = "deploy_commands";
pub const HEALTH_TOPIC: &str = "pilot_health_check";

/// Builder for deploy command JSON payloads
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    value: Value,
}

impl CommandBuilder {
    pub fn new(deploy_name: &str) -> Self {
        Self {
            value: json!({
                "deployName": deploy_name,
                "namespace": "default",
                "containerSpec": {
                    "image": "nginx:1.27",
                    "command": "",
                    "args": [],
                    "env": {},
                    "port": 80
                },
                "resources": {
                    "requests": {"cpu": 250, "memory": 1},
                    "limits": {"cpu": 500, "memory": 2}
                }
            }),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.value["namespace"] = json!(namespace);
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.value["containerSpec"]["command"] = json!(command);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.value["containerSpec"]["env"][key] = json!(value);
        self
    }

    pub fn json(&self) -> Value {
        self.value.clone()
    }

    pub fn bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.value).unwrap()
    }
}

/// Cluster client that records submissions and can reject chosen names
#[derive(Default)]
pub struct RecordingClusterClient {
    created: Mutex<Vec<(String, Deployment)>>,
    rejected_names: Mutex<HashSet<String>>,
}

impl RecordingClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail creation of any deployment called `name`
    pub fn reject(&self, name: &str) {
        self.rejected_names.lock().insert(name.to_string());
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created
            .lock()
            .iter()
            .filter_map(|(_, deployment)| deployment.metadata.name.clone())
            .collect()
    }

    pub fn created(&self) -> Vec<(String, Deployment)> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl ClusterClient for RecordingClusterClient {
    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: Deployment,
    ) -> ClusterResult<()> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        if self.rejected_names.lock().contains(&name) {
            return Err(ClusterError::create_failed(namespace, &name, "admission denied"));
        }
        self.created.lock().push((namespace.to_string(), deployment));
        Ok(())
    }
}

/// Cluster client whose every creation takes `delay` to complete
pub struct SlowClusterClient {
    delay: Duration,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowClusterClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::Acquire)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ClusterClient for SlowClusterClient {
    async fn create_deployment(
        &self,
        _namespace: &str,
        _deployment: Deployment,
    ) -> ClusterResult<()> {
        self.started.fetch_add(1, Ordering::AcqRel);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Configuration for an agent on the in-process backend with an ephemeral
/// HTTP port
pub fn test_config() -> AgentConfig {
    let mut config = AgentConfig {
        queue: QueueConfig {
            broker_url: "memory://test".to_string(),
            create_deploy_topic: DEPLOY_TOPIC.to_string(),
            health_check_topic: HEALTH_TOPIC.to_string(),
            ..QueueConfig::default()
        },
        shutdown: ShutdownConfig {
            grace_period_seconds: 5,
        },
        ..AgentConfig::default()
    };
    config.http.bind_address = "127.0.0.1:0".to_string();
    config.health.timeout_ms = 500;
    config
}
