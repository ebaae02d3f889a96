//! # Agent Configuration
//!
//! Explicit configuration value built once at startup and passed to every
//! component that needs it. There is no global configuration singleton.
//!
//! ## Sources
//!
//! Lowest to highest precedence:
//!
//! 1. Built-in defaults (the `Default` impls below)
//! 2. An optional TOML file (`PILOT_CONFIG`, else `config/pilot.toml`)
//! 3. Environment variables prefixed `PILOT_`, using `__` between sections,
//!    e.g. `PILOT_QUEUE__BROKER_URL`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pilot_agent::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::from_process_env().load()?;
//! println!("consuming {}", config.queue.create_deploy_topic);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Message queue (broker) settings
    pub queue: QueueConfig,

    /// Liveness HTTP server settings
    pub http: HttpConfig,

    /// Health probe settings
    pub health: HealthConfig,

    /// Shutdown coordination settings
    pub shutdown: ShutdownConfig,
}

impl AgentConfig {
    /// Reject configurations the agent cannot start with
    pub fn validate(&self) -> ConfigResult<()> {
        self.queue.validate()?;
        self.http.validate()?;
        self.health.validate()?;
        Ok(())
    }
}

/// Queue connection and topic names
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// PostgreSQL URL of the pgmq broker database
    pub broker_url: String,
    /// Topic carrying deployment commands
    pub create_deploy_topic: String,
    /// Topic used only for health heartbeats
    pub health_check_topic: String,
    /// Idle wait between empty reads
    pub poll_interval_ms: u64,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            broker_url: String::new(),
            create_deploy_topic: String::new(),
            health_check_topic: "pilot_health_check".to_string(),
            poll_interval_ms: 250,
            max_connections: 5,
            connect_timeout_seconds: 5,
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// `memory://` selects the in-process backend for local runs
    pub fn uses_in_memory_backend(&self) -> bool {
        self.broker_url.starts_with("memory://")
    }

    /// Broker URL with any password masked, safe for log output
    pub fn redacted_broker_url(&self) -> String {
        let Some((scheme, rest)) = self.broker_url.split_once("://") else {
            return self.broker_url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.broker_url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _password)) => format!("{scheme}://{user}:***@{host}"),
            None => self.broker_url.clone(),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.broker_url.trim().is_empty() {
            return Err(ConfigurationError::missing_value("queue.broker_url"));
        }
        if self.create_deploy_topic.trim().is_empty() {
            return Err(ConfigurationError::missing_value("queue.create_deploy_topic"));
        }
        if self.health_check_topic.trim().is_empty() {
            return Err(ConfigurationError::missing_value("queue.health_check_topic"));
        }
        if self.health_check_topic == self.create_deploy_topic {
            return Err(ConfigurationError::invalid_value(
                "queue.health_check_topic",
                &self.health_check_topic,
                "must differ from queue.create_deploy_topic",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.poll_interval_ms",
                "0",
                "must be greater than zero",
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.max_connections",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Liveness HTTP server
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
    pub shutdown_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            shutdown_timeout_seconds: 10,
        }
    }
}

impl HttpConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigurationError::missing_value("http.bind_address"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Deadline for one heartbeat round-trip
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound on waiting for components after cancellation; 0 waits forever
    pub grace_period_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: 30,
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Option<Duration> {
        (self.grace_period_seconds > 0).then(|| Duration::from_secs(self.grace_period_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AgentConfig {
        AgentConfig {
            queue: QueueConfig {
                broker_url: "postgres://pilot:secret@db:5432/pilot".to_string(),
                create_deploy_topic: "deploy_commands".to_string(),
                ..QueueConfig::default()
            },
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.queue.health_check_topic, "pilot_health_check");
        assert_eq!(config.queue.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.http.bind_address, "0.0.0.0:8080");
        assert_eq!(config.http.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.health.timeout(), Duration::from_secs(5));
        assert_eq!(config.shutdown.grace_period(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validate_requires_broker_and_topic() {
        assert!(valid_config().validate().is_ok());

        let err = AgentConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingValue { ref key } if key == "queue.broker_url"));

        let mut config = valid_config();
        config.queue.create_deploy_topic = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigurationError::MissingValue { ref key } if key == "queue.create_deploy_topic")
        );
    }

    #[test]
    fn test_validate_rejects_shared_health_topic() {
        let mut config = valid_config();
        config.queue.health_check_topic = "deploy_commands".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let mut config = valid_config();
        config.health.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.queue.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_grace_period_waits_forever() {
        let config = ShutdownConfig {
            grace_period_seconds: 0,
        };
        assert_eq!(config.grace_period(), None);
    }

    #[test]
    fn test_redacted_broker_url() {
        assert_eq!(
            valid_config().queue.redacted_broker_url(),
            "postgres://pilot:***@db:5432/pilot"
        );

        let config = QueueConfig {
            broker_url: "postgres://localhost/pilot".to_string(),
            ..QueueConfig::default()
        };
        assert_eq!(config.redacted_broker_url(), "postgres://localhost/pilot");
    }
}
