//! # Deployment Spec Builder
//!
//! Pure mapping from a [`DeployCommand`] to a Kubernetes `Deployment`.
//!
//! The produced object always has one replica, and both its selector and its
//! pod template carry `app: <deployName>`; that label is what ties the pods
//! to the deployment. Quantities are formatted but not validated: `250` CPU
//! becomes `"250m"`, `2` memory becomes `"2Gi"`, and a negative value is
//! passed along for the API server to reject.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

use crate::models::{ComputeResources, DeployCommand};

/// Label key shared by the selector and the pod template
pub const APP_LABEL: &str = "app";

/// Milli-core quantity string, e.g. `250m`
pub fn format_cpu(millicores: i64) -> String {
    format!("{millicores}m")
}

/// Gibibyte quantity string, e.g. `2Gi`
pub fn format_memory(gibibytes: i64) -> String {
    format!("{gibibytes}Gi")
}

fn resource_list(resources: &ComputeResources) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(format_cpu(resources.cpu))),
        ("memory".to_string(), Quantity(format_memory(resources.memory))),
    ])
}

fn app_labels(deploy_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), deploy_name.to_string())])
}

/// One `EnvVar` per key of the command's env map
pub fn env_vars(env: &BTreeMap<String, String>) -> Vec<EnvVar> {
    env.iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..EnvVar::default()
        })
        .collect()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Build the single-replica deployment described by `command`
pub fn build_deployment(command: &DeployCommand) -> Deployment {
    let spec = &command.container_spec;
    let labels = app_labels(&command.deploy_name);

    let container = Container {
        name: command.deploy_name.clone(),
        image: Some(spec.image.clone()),
        // An empty argv leaves the image's entrypoint in place
        command: non_empty(spec.argv()),
        args: non_empty(spec.args.clone()),
        env: non_empty(env_vars(&spec.env)),
        ports: Some(vec![ContainerPort {
            container_port: spec.port,
            ..ContainerPort::default()
        }]),
        resources: Some(ResourceRequirements {
            requests: Some(resource_list(&command.resources.requests)),
            limits: Some(resource_list(&command.resources.limits)),
            ..ResourceRequirements::default()
        }),
        ..Container::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(command.deploy_name.clone()),
            namespace: Some(command.namespace.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}
