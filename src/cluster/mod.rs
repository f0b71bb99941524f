//! Kubernetes cluster helpers.
//!
//! Connection setup, watch-based waits, object lifecycle, pod exec and the
//! operator/driver health and version queries used by the suite.

mod events;
mod exec;
mod info;
mod objects;
mod wait;

use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use crate::error::Result;

pub use events::{events_for, wait_for_event};
pub use exec::exec;
pub use info::{VersionReport, check_csi_operator, driver_image, kubernetes_version, operator_image};
pub use objects::{create, delete, delete_and_wait, delete_labeled};
pub use wait::{WaitError, wait_for_condition, wait_for_deletion, wait_for_resource};

/// Connect to the cluster.
///
/// Uses `kubeconfig` when given, otherwise the in-cluster or default
/// kubeconfig. The API server is queried once to validate the connection.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };
    let client = Client::try_from(config)?;

    let version = client.apiserver_version().await?;
    info!(
        platform = %version.platform,
        version = %version.git_version,
        "Connected to Kubernetes cluster"
    );

    Ok(client)
}
