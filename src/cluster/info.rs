//! Version report and CSI operator health.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::PodSpec;
use kube::{Api, Client};
use tracing::info;

use crate::driver::ScaleVersion;
use crate::error::{Error, Result};

/// Versions of everything involved in a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionReport {
    pub scale: ScaleVersion,
    pub kubernetes: String,
    pub operator_image: Option<String>,
    pub driver_image: Option<String>,
}

impl std::fmt::Display for VersionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "IBM Spectrum Scale version: {}", self.scale)?;
        writeln!(f, "Kubernetes version: {}", self.kubernetes)?;
        writeln!(
            f,
            "Operator image: {}",
            self.operator_image.as_deref().unwrap_or("unknown")
        )?;
        write!(
            f,
            "Driver image: {}",
            self.driver_image.as_deref().unwrap_or("unknown")
        )
    }
}

/// Git version of the API server.
pub async fn kubernetes_version(client: &Client) -> Result<String> {
    Ok(client.apiserver_version().await?.git_version)
}

fn first_image(spec: Option<&PodSpec>) -> Option<String> {
    spec.and_then(|s| s.containers.first())
        .and_then(|c| c.image.clone())
}

/// Image of the operator deployment.
pub async fn operator_image(client: &Client, namespace: &str, name: &str) -> Result<Option<String>> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let deployment = api.get(name).await?;
    Ok(first_image(
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref()),
    ))
}

/// Image of the driver daemon set.
pub async fn driver_image(client: &Client, namespace: &str, name: &str) -> Result<Option<String>> {
    let api: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
    let daemonset = api.get(name).await?;
    Ok(first_image(
        daemonset
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref()),
    ))
}

/// Verify the operator deployment is available and the driver runs.
pub async fn check_csi_operator(
    client: &Client,
    namespace: &str,
    deployment: &str,
    daemonset: &str,
) -> Result<()> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let available = match deployments.get(deployment).await {
        Ok(d) => d.status.and_then(|s| s.available_replicas).unwrap_or(0),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            return Err(Error::OperatorNotReady(format!(
                "deployment {}/{} not found",
                namespace, deployment
            )));
        }
        Err(e) => return Err(e.into()),
    };
    if available < 1 {
        return Err(Error::OperatorNotReady(format!(
            "deployment {}/{} has no available replicas",
            namespace, deployment
        )));
    }

    let daemonsets: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
    let ready = match daemonsets.get(daemonset).await {
        Ok(d) => d.status.map(|s| s.number_ready).unwrap_or(0),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            return Err(Error::OperatorNotReady(format!(
                "daemon set {}/{} not found",
                namespace, daemonset
            )));
        }
        Err(e) => return Err(e.into()),
    };
    if ready < 1 {
        return Err(Error::OperatorNotReady(format!(
            "daemon set {}/{} has no ready pods",
            namespace, daemonset
        )));
    }

    info!(namespace, available, ready, "CSI operator is running");
    Ok(())
}
