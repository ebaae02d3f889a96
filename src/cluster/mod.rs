//! # Cluster Module
//!
//! Kubernetes side of the agent: the deployment spec builder and the client
//! seam used to submit it.

pub mod client;
pub mod spec_builder;

pub use client::{ClusterClient, ClusterError, ClusterResult, KubeClusterClient};
pub use spec_builder::{build_deployment, format_cpu, format_memory, APP_LABEL};
