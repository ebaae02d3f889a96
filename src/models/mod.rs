//! # Models
//!
//! Message schemas the agent consumes.

pub mod deploy_command;

pub use deploy_command::{
    CommandDecodeError, ComputeResources, ContainerSpec, DeployCommand, Resources,
};
