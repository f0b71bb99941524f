//! Snapshot scenarios.
//!
//! [`SnapshotSuite`] owns the cluster connections and the defaults of a run
//! and exposes the two scenarios every case delegates to:
//!
//! - [`SnapshotSuite::test_dynamic`]: snapshots taken by the driver from a
//!   provisioned claim
//! - [`SnapshotSuite::test_static`]: snapshots created on the filesystem and
//!   registered as pre-provisioned content
//!
//! Both optionally restore a claim from every snapshot and verify it.

mod cleanup;
mod dynamic;
mod plan;
mod pre_provisioned;
mod run;

pub use cleanup::Created;
pub use plan::{
    SnapshotStep, claim_failure, expected_snapshot_error, judge_snapshot, restore_claim_params,
    restore_storage, snapshot_outcome, snapshot_settled,
};
pub use run::SnapshotRun;

use std::collections::BTreeMap;
use std::time::Duration;

use jiff::Timestamp;
use k8s_openapi::api::core::v1::{Namespace, PersistentVolumeClaim, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{ObjectMeta, Patch, PatchParams};
use kube::{Api, Client};
use tracing::{debug, info, warn};

use crate::cluster::{self, wait_for_condition};
use crate::config::{CommandValues, DriverData};
use crate::crd::{VolumeSnapshot, VolumeSnapshotClass};
use crate::driver::ScaleVersion;
use crate::error::{Error, Result};
use crate::params::{PodParams, PvcParams, SnapshotClassParams, StorageClassParams, parse_quantity};
use crate::resources::{snapshot, storage, unique_name, workload};
use crate::scale::ScaleClient;

/// How long each kind of wait may take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub claim_bound: Duration,
    pub pod_running: Duration,
    pub snapshot_ready: Duration,
    pub expansion: Duration,
    pub event: Duration,
    pub deletion: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            claim_bound: Duration::from_secs(300),
            pod_running: Duration::from_secs(300),
            snapshot_ready: Duration::from_secs(300),
            expansion: Duration::from_secs(300),
            event: Duration::from_secs(180),
            deletion: Duration::from_secs(180),
        }
    }
}

/// Defaults and targets of a suite.
#[derive(Clone, Debug)]
pub struct SuiteConfig {
    pub namespace: String,
    pub keep_objects: bool,
    pub value_pvc: Vec<PvcParams>,
    pub value_vs_class: SnapshotClassParams,
    pub number_of_snapshots: usize,
    pub image_name: String,
    pub cluster_id: String,
    pub plugin_node_selector: BTreeMap<String, String>,
    /// Filesystem static snapshots are created on.
    pub primary_fs: String,
    pub inode_limit: String,
    pub operator_namespace: String,
    pub operator_deployment: String,
    pub driver_daemonset: String,
    pub timeouts: Timeouts,
}

impl SuiteConfig {
    /// Defaults for a resolved driver data file.
    ///
    /// One RWX 1Gi claim per run, plus an RWO 1Gi claim when slow cases run.
    pub fn from_driver_data(data: &DriverData, namespace: impl Into<String>, run_slow: bool) -> Self {
        let mut value_pvc = vec![PvcParams::rwx_1gi()];
        if run_slow {
            value_pvc.push(PvcParams::rwo_1gi());
        }
        Self {
            namespace: namespace.into(),
            keep_objects: data.keepobjects,
            value_pvc,
            value_vs_class: SnapshotClassParams::delete(),
            number_of_snapshots: 1,
            image_name: data.image_name.clone(),
            cluster_id: data.id.clone(),
            plugin_node_selector: data.plugin_node_selector.clone(),
            primary_fs: data.primary_fs.clone(),
            inode_limit: data.inode_limit.clone(),
            operator_namespace: data.operator_namespace.clone(),
            operator_deployment: data.operator_deployment.clone(),
            driver_daemonset: data.driver_daemonset.clone(),
            timeouts: Timeouts::default(),
        }
    }
}

/// Runs snapshot scenarios against a live cluster.
pub struct SnapshotSuite {
    client: Client,
    scale: ScaleClient,
    config: SuiteConfig,
    scale_version: Option<ScaleVersion>,
}

impl SnapshotSuite {
    pub fn new(client: Client, scale: ScaleClient, config: SuiteConfig) -> Self {
        Self {
            client,
            scale,
            config,
            scale_version: None,
        }
    }

    /// Build the suite the way every case expects it.
    ///
    /// Loads the driver data, connects to both clusters, makes sure the test
    /// namespace exists and checks the CSI operator is running.
    pub async fn from_fixture(values: &CommandValues) -> Result<(Self, DriverData)> {
        let data = DriverData::load(&values.test_config)?;
        let client = cluster::connect(values.kubeconfig_value.as_deref()).await?;
        let scale = ScaleClient::from_driver_data(&data)?;
        let config = SuiteConfig::from_driver_data(&data, &values.test_namespace, values.runslow_val);

        cluster::check_csi_operator(
            &client,
            &config.operator_namespace,
            &config.operator_deployment,
            &config.driver_daemonset,
        )
        .await?;

        let mut suite = Self::new(client, scale, config);
        suite.ensure_namespace().await?;
        suite.scale_version = match suite.scale.scale_version().await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(error = %e, "Could not read the filesystem version");
                None
            }
        };
        Ok((suite, data))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Filesystem version read when the suite was built.
    pub fn scale_version(&self) -> Option<ScaleVersion> {
        self.scale_version
    }

    /// Versions of the filesystem, Kubernetes, operator and driver.
    pub async fn version_report(&self) -> Result<cluster::VersionReport> {
        let scale = self.scale.scale_version().await?;
        let kubernetes = cluster::kubernetes_version(&self.client).await?;
        let operator_image = cluster::operator_image(
            &self.client,
            &self.config.operator_namespace,
            &self.config.operator_deployment,
        )
        .await?;
        let driver_image = cluster::driver_image(
            &self.client,
            &self.config.operator_namespace,
            &self.config.driver_daemonset,
        )
        .await?;
        let report = cluster::VersionReport {
            scale,
            kubernetes,
            operator_image,
            driver_image,
        };
        info!(
            scale = %report.scale,
            kubernetes = %report.kubernetes,
            operator = ?report.operator_image,
            driver = ?report.driver_image,
            "Cluster details"
        );
        Ok(report)
    }

    /// Delete the Kubernetes objects a kept run of `case` left behind.
    pub async fn purge(&self, case: &str) -> usize {
        cleanup::purge(&self.client, self.namespace(), case).await
    }

    async fn ensure_namespace(&self) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        if api.get_opt(self.namespace()).await?.is_some() {
            return Ok(());
        }
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(self.namespace().to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        cluster::create(&api, &namespace).await?;
        info!(namespace = %self.namespace(), "Created test namespace");
        Ok(())
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), self.namespace())
    }

    fn claims(&self) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), self.namespace())
    }

    fn snapshots(&self) -> Api<VolumeSnapshot> {
        Api::namespaced(self.client.clone(), self.namespace())
    }

    /// Remove what a run created unless objects are kept, then return the
    /// run result. A cleanup failure only surfaces when the run succeeded.
    async fn finish(&self, created: Created, result: Result<()>) -> Result<()> {
        if self.config.keep_objects {
            info!(?created, "Keeping objects");
            return result;
        }
        let cleanup = cleanup::remove(
            &self.client,
            &self.scale,
            self.namespace(),
            created,
            self.config.timeouts.deletion,
        )
        .await;
        result.and(cleanup)
    }

    async fn create_storage_class(
        &self,
        params: &StorageClassParams,
        label: &str,
        created: &mut Created,
    ) -> Result<String> {
        let name = unique_name("sc");
        let api: Api<StorageClass> = Api::all(self.client.clone());
        cluster::create(&api, &storage::storage_class(&name, params, self.namespace(), label)).await?;
        created.storage_classes.push(name.clone());
        Ok(name)
    }

    async fn create_snapshot_class(
        &self,
        params: &SnapshotClassParams,
        label: &str,
        created: &mut Created,
    ) -> Result<String> {
        let name = unique_name("vsclass");
        let api: Api<VolumeSnapshotClass> = Api::all(self.client.clone());
        cluster::create(&api, &snapshot::snapshot_class(&name, params, label)).await?;
        created.snapshot_classes.push(name.clone());
        Ok(name)
    }

    async fn create_claim(&self, claim: &PersistentVolumeClaim, created: &mut Created) -> Result<String> {
        let stored = cluster::create(&self.claims(), claim).await?;
        let name = stored.metadata.name.unwrap_or_default();
        created.claims.push(name.clone());
        Ok(name)
    }

    /// Wait until a claim binds. A claim that times out reports the
    /// provisioning error from its events when there is one.
    async fn wait_bound(&self, name: &str) -> Result<PersistentVolumeClaim> {
        let claim = match wait_for_condition(
            &self.claims(),
            name,
            storage::is_bound,
            self.config.timeouts.claim_bound,
        )
        .await
        {
            Ok(claim) => claim,
            Err(e @ cluster::WaitError::Timeout(_)) => {
                let events = cluster::events_for(&self.client, self.namespace(), "PersistentVolumeClaim", name)
                    .await
                    .unwrap_or_default();
                return Err(claim_failure(name, &events)
                    .unwrap_or_else(|| Error::wait(format!("PersistentVolumeClaim {}", name), e)));
            }
            Err(e) => return Err(Error::wait(format!("PersistentVolumeClaim {}", name), e)),
        };
        debug!(claim = name, capacity = ?storage::capacity(&claim), "Claim bound");
        Ok(claim)
    }

    /// Start a pod on `claim` and wait until it runs.
    async fn start_pod(
        &self,
        claim: &str,
        params: &PodParams,
        label: &str,
        created: &mut Created,
    ) -> Result<String> {
        let name = unique_name("pod");
        let pod = workload::pod(
            &name,
            self.namespace(),
            claim,
            &self.config.image_name,
            params,
            &self.config.plugin_node_selector,
            label,
        );
        cluster::create(&self.pods(), &pod).await?;
        created.pods.push(name.clone());
        wait_for_condition(
            &self.pods(),
            &name,
            workload::is_running,
            self.config.timeouts.pod_running,
        )
        .await
        .map_err(|e| Error::wait(format!("Pod {}", name), e))?;
        Ok(name)
    }

    async fn write_marker(&self, pod: &str, params: &PodParams, claim: &str) -> Result<String> {
        let content = format!("{} {}", claim, Timestamp::now());
        cluster::exec(&self.pods(), pod, workload::write_marker_command(params, &content)).await?;
        debug!(pod, claim, "Wrote marker file");
        Ok(content)
    }

    async fn verify_marker(&self, pod: &str, params: &PodParams, claim: &str, expected: &str) -> Result<()> {
        let actual = cluster::exec(&self.pods(), pod, workload::read_marker_command(params)).await?;
        if actual.trim_end() != expected {
            return Err(Error::DataMismatch {
                claim: claim.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        info!(claim, "Data verified");
        Ok(())
    }

    /// Resize a claim and wait until the new capacity is reported.
    async fn expand(&self, claim: &str, size: &str) -> Result<()> {
        let requested = parse_quantity(size)?;
        self.claims()
            .patch(
                claim,
                &PatchParams::default(),
                &Patch::Merge(storage::resize_patch(size)),
            )
            .await?;
        wait_for_condition(
            &self.claims(),
            claim,
            |pvc| {
                storage::capacity(pvc)
                    .and_then(|c| parse_quantity(c).ok())
                    .is_some_and(|bytes| bytes >= requested)
            },
            self.config.timeouts.expansion,
        )
        .await
        .map_err(|e| Error::wait(format!("expansion of {} to {}", claim, size), e))?;
        info!(claim, size, "Claim expanded");
        Ok(())
    }

    /// Wait until a snapshot is ready or fails with `expected_error`.
    ///
    /// Other errors are logged and waited out. On timeout the last recorded
    /// error, if any, becomes the snapshot failure.
    async fn wait_for_snapshot(&self, name: &str, expected_error: Option<&str>) -> Result<VolumeSnapshot> {
        let settled = |s: &VolumeSnapshot| {
            let done = snapshot_settled(s, expected_error);
            if !done && let Some(message) = s.error_message() {
                warn!(snapshot = name, message, "Snapshot not ready yet");
            }
            done
        };
        match wait_for_condition(&self.snapshots(), name, settled, self.config.timeouts.snapshot_ready).await {
            Ok(snapshot) => snapshot_outcome(name, snapshot),
            Err(e @ cluster::WaitError::Timeout(_)) => {
                let last = self.snapshots().get_opt(name).await?;
                if let Some(message) = last.as_ref().and_then(VolumeSnapshot::error_message) {
                    return Err(Error::SnapshotFailed {
                        name: name.to_string(),
                        message: message.to_string(),
                    });
                }
                Err(Error::wait(format!("VolumeSnapshot {}", name), e))
            }
            Err(e) => Err(Error::wait(format!("VolumeSnapshot {}", name), e)),
        }
    }

    /// Restore a claim from `snapshot` and check it.
    ///
    /// With a `reason` on the restore claim the claim must report a matching
    /// event instead of binding. `expected` is the marker content to read
    /// back, if any.
    #[allow(clippy::too_many_arguments)]
    async fn restore(
        &self,
        snapshot: &VolumeSnapshot,
        storage_class: &str,
        source: &PvcParams,
        run: &SnapshotRun,
        pod: &PodParams,
        expected: Option<&str>,
        created: &mut Created,
    ) -> Result<()> {
        let snapshot_name = snapshot.metadata.name.as_deref().unwrap_or_default();
        let params = restore_claim_params(run, source, snapshot);
        let name = unique_name("restored-pvc");
        let claim = storage::claim_from_snapshot(
            &name,
            self.namespace(),
            &params,
            &params.storage,
            storage_class,
            snapshot_name,
            &run.label,
        );
        self.create_claim(&claim, created).await?;

        if let Some(reason) = &params.reason {
            let message = match cluster::wait_for_event(
                &self.client,
                self.namespace(),
                "PersistentVolumeClaim",
                &name,
                reason,
                self.config.timeouts.event,
            )
            .await
            {
                Ok(message) => message,
                Err(cluster::WaitError::Timeout(_)) => {
                    let seen = cluster::events_for(
                        &self.client,
                        self.namespace(),
                        "PersistentVolumeClaim",
                        &name,
                    )
                    .await
                    .unwrap_or_default();
                    warn!(claim = %name, events = ?seen, "Expected failure event not seen");
                    return Err(Error::ExpectedFailureMissing {
                        resource: format!("PersistentVolumeClaim {}", name),
                        reason: reason.clone(),
                    });
                }
                Err(other) => return Err(Error::wait(format!("events of {}", name), other)),
            };
            info!(claim = %name, %message, "Restore failed as expected");
            return Ok(());
        }

        self.wait_bound(&name).await?;
        let reader = self.start_pod(&name, pod, &run.label, created).await?;
        if let Some(expected) = expected {
            self.verify_marker(&reader, pod, &name, expected).await?;
        }
        for size in &source.post_presnap_volume_expansion_storage {
            self.expand(&name, size).await?;
        }
        info!(claim = %name, snapshot = snapshot_name, "Restored claim");
        Ok(())
    }
}
