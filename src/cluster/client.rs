//! # Cluster Client
//!
//! The one cluster operation the agent needs: create a deployment in a
//! namespace. The trait is the seam handlers depend on; the kube-backed
//! implementation is what the binary wires in.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("failed to create deployment {name} in namespace {namespace}: {message}")]
    CreateFailed {
        namespace: String,
        name: String,
        message: String,
    },

    #[error("Kubernetes client unavailable: {message}")]
    ClientUnavailable { message: String },
}

impl ClusterError {
    pub fn create_failed(
        namespace: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CreateFailed {
            namespace: namespace.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn client_unavailable(message: impl Into<String>) -> Self {
        Self::ClientUnavailable {
            message: message.into(),
        }
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Already-authenticated access to the cluster API, shared by all loops
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Submit `deployment` to `namespace`. Ownership of the object moves here.
    async fn create_deployment(&self, namespace: &str, deployment: Deployment)
        -> ClusterResult<()>;
}

/// `kube`-backed cluster client
#[derive(Clone)]
pub struct KubeClusterClient {
    client: kube::Client,
}

impl KubeClusterClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// In-cluster service account first, then the local kubeconfig
    pub async fn try_default() -> ClusterResult<Self> {
        debug!("Inferring Kubernetes client configuration");
        let client = kube::Client::try_default()
            .await
            .map_err(|e| ClusterError::client_unavailable(e.to_string()))?;
        info!(
            default_namespace = %client.default_namespace(),
            "✅ Kubernetes client ready"
        );
        Ok(Self::new(client))
    }
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("default_namespace", &self.client.default_namespace())
            .finish()
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: Deployment,
    ) -> ClusterResult<()> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        deployments
            .create(&PostParams::default(), &deployment)
            .await
            .map_err(|e| ClusterError::create_failed(namespace, &name, e.to_string()))?;

        info!(deploy_name = %name, namespace = %namespace, "Deployment created");
        Ok(())
    }
}
