//! Create-deployment handler: decode a [`DeployCommand`], build the
//! deployment, submit it.

use async_trait::async_trait;
use tracing::debug;

use super::{HandlerError, MessageHandler};
use crate::cluster::{build_deployment, ClusterClient};
use crate::models::DeployCommand;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDeploymentHandler;

impl CreateDeploymentHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageHandler for CreateDeploymentHandler {
    async fn handle(&self, client: &dyn ClusterClient, payload: &[u8]) -> Result<(), HandlerError> {
        let command = DeployCommand::decode(payload)?;
        debug!(
            deploy_name = %command.deploy_name,
            namespace = %command.namespace,
            image = %command.container_spec.image,
            "Decoded deploy command"
        );

        let deployment = build_deployment(&command);
        client
            .create_deployment(&command.namespace, deployment)
            .await?;
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "create_deployment"
    }
}
