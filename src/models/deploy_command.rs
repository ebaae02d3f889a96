//! Deploy Command
//!
//! Wire schema for a deployment request. A command is decoded once from the
//! message payload and only borrowed afterwards; nothing mutates it.
//!
//! Validation is minimal: the three identifying strings must be
//! non-empty. Quantities are passed through untouched and the cluster API is
//! the authority on acceptable ranges.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Payload decode failures
#[derive(Error, Debug)]
pub enum CommandDecodeError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required field is empty: {field}")]
    EmptyField { field: &'static str },
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A request to run one container as a single-replica deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployCommand {
    /// Deployment name; also the `app` label value
    pub deploy_name: String,

    /// Target namespace
    pub namespace: String,

    pub container_spec: ContainerSpec,

    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Resources,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image: String,

    /// Entrypoint override as a single string, split on whitespace
    #[serde(default, deserialize_with = "null_as_default")]
    pub command: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<String>,

    /// Keys are unique by construction; iteration order is by key
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub port: i32,
}

impl ContainerSpec {
    /// Entrypoint argv; empty when no override was given
    pub fn argv(&self) -> Vec<String> {
        self.command.split_whitespace().map(str::to_string).collect()
    }
}

/// Requests and limits for the container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, deserialize_with = "null_as_default")]
    pub requests: ComputeResources,
    #[serde(default, deserialize_with = "null_as_default")]
    pub limits: ComputeResources,
}

/// CPU in milli-cores, memory in gibibytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResources {
    #[serde(default)]
    pub cpu: i64,
    #[serde(default)]
    pub memory: i64,
}

impl DeployCommand {
    /// Decode and minimally validate a message payload
    pub fn decode(payload: &[u8]) -> Result<Self, CommandDecodeError> {
        let command: Self = serde_json::from_slice(payload)?;
        command.validate()?;
        Ok(command)
    }

    pub fn validate(&self) -> Result<(), CommandDecodeError> {
        if self.deploy_name.trim().is_empty() {
            return Err(CommandDecodeError::EmptyField { field: "deployName" });
        }
        if self.namespace.trim().is_empty() {
            return Err(CommandDecodeError::EmptyField { field: "namespace" });
        }
        if self.container_spec.image.trim().is_empty() {
            return Err(CommandDecodeError::EmptyField {
                field: "containerSpec.image",
            });
        }
        Ok(())
    }
}
