//! End-to-end agent lifecycle on the in-process backend

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;

use pilot_agent::bootstrap::AgentBootstrap;
use pilot_agent::handlers::CreateDeploymentHandler;
use pilot_agent::messaging::{InMemoryQueue, QueueBackend};
use pilot_agent::registry::TopicHandlerRegistry;
use pilot_agent::PilotError;

#[tokio::test]
async fn test_agent_consumes_serves_and_shuts_down() {
    let queue = InMemoryQueue::new();
    let client = Arc::new(RecordingClusterClient::new());

    let agent = AgentBootstrap::start(test_config(), Arc::new(queue.clone()), client.clone())
        .await
        .unwrap();
    assert_eq!(agent.topics(), vec![DEPLOY_TOPIC]);

    queue
        .publish_json(
            DEPLOY_TOPIC,
            &CommandBuilder::new("api").namespace("prod").json(),
        )
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || client.created_count() == 1).await);

    let (namespace, deployment) = client.created().remove(0);
    assert_eq!(namespace, "prod");
    assert_eq!(deployment.metadata.name.as_deref(), Some("api"));

    let healthz = reqwest::get(format!("http://{}/healthz", agent.local_addr()))
        .await
        .unwrap();
    assert_eq!(healthz.status(), reqwest::StatusCode::OK);

    let summary = agent.shutdown().await;
    assert!(summary.report.is_clean());
    assert_eq!(
        summary.report.completed,
        vec![format!("consumer:{DEPLOY_TOPIC}"), "http_server".to_string()]
    );
    assert_eq!(summary.consumer_stats.len(), 1);
    assert_eq!(summary.consumer_stats[0].1.processed, 1);

    assert!(queue.is_reader_released(DEPLOY_TOPIC));
    assert!(queue.is_closed());
}

#[tokio::test]
async fn test_one_loop_per_registered_topic() {
    let queue = InMemoryQueue::new();
    let client = Arc::new(RecordingClusterClient::new());

    let mut registry = TopicHandlerRegistry::new();
    for topic in ["deploy_eu", "deploy_us"] {
        registry
            .register(topic, Arc::new(CreateDeploymentHandler::new()))
            .unwrap();
    }

    let agent = AgentBootstrap::start_with_registry(
        test_config(),
        Arc::new(queue.clone()),
        client.clone(),
        registry,
    )
    .await
    .unwrap();
    assert_eq!(agent.topics(), vec!["deploy_eu", "deploy_us"]);

    queue
        .publish("deploy_eu", CommandBuilder::new("eu-app").bytes())
        .unwrap();
    queue
        .publish("deploy_us", CommandBuilder::new("us-app").bytes())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || client.created_count() == 2).await);

    let summary = agent.shutdown().await;
    assert!(summary.report.is_clean());
    assert!(queue.is_reader_released("deploy_eu"));
    assert!(queue.is_reader_released("deploy_us"));
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_handler_finish_past_grace_period() {
    let queue = InMemoryQueue::new();
    let client = Arc::new(SlowClusterClient::new(Duration::from_millis(1500)));
    let mut config = test_config();
    config.shutdown.grace_period_seconds = 1;

    let agent = AgentBootstrap::start(config, Arc::new(queue.clone()), client.clone())
        .await
        .unwrap();
    queue
        .publish(DEPLOY_TOPIC, CommandBuilder::new("slow").bytes())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || client.started() == 1).await);

    let summary = agent.shutdown().await;

    // The loop outlived the grace period but was not cut off
    assert_eq!(
        summary.report.timed_out,
        vec![format!("consumer:{DEPLOY_TOPIC}")]
    );
    assert_eq!(client.finished(), 1);
    assert_eq!(summary.consumer_stats.len(), 1);
    assert_eq!(summary.consumer_stats[0].1.processed, 1);

    assert!(queue.is_reader_released(DEPLOY_TOPIC));
    assert!(queue.was_released_before_close(DEPLOY_TOPIC));
    assert!(queue.is_closed());
}

#[tokio::test]
async fn test_clean_shutdown_releases_readers_before_backend() {
    let queue = InMemoryQueue::new();
    let agent = AgentBootstrap::start(
        test_config(),
        Arc::new(queue.clone()),
        Arc::new(RecordingClusterClient::new()),
    )
    .await
    .unwrap();

    let summary = agent.shutdown().await;
    assert!(summary.report.is_clean());
    assert!(queue.was_released_before_close(DEPLOY_TOPIC));
}

#[tokio::test]
async fn test_startup_fails_when_backend_is_unavailable() {
    let queue = InMemoryQueue::new();
    queue.close().await;

    let result = AgentBootstrap::start(
        test_config(),
        Arc::new(queue),
        Arc::new(RecordingClusterClient::new()),
    )
    .await;

    assert!(matches!(result, Err(PilotError::Messaging(_))));
}

#[tokio::test]
async fn test_startup_fails_when_http_port_is_taken() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config();
    config.http.bind_address = occupied.local_addr().unwrap().to_string();

    let queue = InMemoryQueue::new();
    let result = AgentBootstrap::start(
        config,
        Arc::new(queue.clone()),
        Arc::new(RecordingClusterClient::new()),
    )
    .await;

    assert!(matches!(result, Err(PilotError::Startup(_))));
    // Nothing was left reading
    assert!(!queue.is_reader_released(DEPLOY_TOPIC));
}
