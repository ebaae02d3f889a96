//! Configuration Loader
//!
//! Layers defaults, an optional TOML file and `PILOT_`-prefixed environment
//! variables into an [`AgentConfig`], then validates the result.

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::AgentConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PILOT";
/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "PILOT_CONFIG";
/// Config file picked up when present and `PILOT_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/pilot.toml";

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_source: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Loader with no file, reading the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading the process environment, with the file resolved from
    /// `PILOT_CONFIG` (required) or `config/pilot.toml` (when it exists)
    pub fn from_process_env() -> Self {
        let loader = Self {
            file: None,
            file_required: false,
            env_source: None,
        };

        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => loader.with_file(path),
            _ => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self {
                        file: Some(default_path.to_path_buf()),
                        ..loader
                    }
                } else {
                    loader
                }
            }
        }
    }

    /// Read `path` as a TOML file; loading fails if it is missing
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Use `vars` in place of the process environment
    pub fn with_environment(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn load(&self) -> ConfigResult<AgentConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            if self.file_required && !path.is_file() {
                return Err(ConfigurationError::file_not_found(path.display().to_string()));
            }
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(self.file_required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source.clone()),
        );

        let config: AgentConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            broker_url = %config.queue.redacted_broker_url(),
            create_deploy_topic = %config.queue.create_deploy_topic,
            health_check_topic = %config.queue.health_check_topic,
            http_bind_address = %config.http.bind_address,
            "Configuration loaded"
        );

        Ok(config)
    }
}
