//! Snapshots taken by the driver from provisioned claims.

use kube::Api;
use tracing::info;

use crate::cluster;
use crate::crd::VolumeSnapshotContent;
use crate::driver::{MAX_SNAPSHOTS_PER_FILESET, StorageClassType};
use crate::error::{Error, Result};
use crate::params::{DeletionPolicy, PodParams, PvcParams, StorageClassParams};
use crate::resources::{snapshot, storage, unique_name};
use crate::suite::{
    Created, SnapshotRun, SnapshotStep, SnapshotSuite, expected_snapshot_error, judge_snapshot,
};

impl SnapshotSuite {
    /// Snapshot provisioned claims and optionally restore and clone them.
    ///
    /// For every claim of the run a writer pod stores a marker file which
    /// restored and cloned claims must contain. With `run.reason` set the
    /// first snapshot must fail with that reason and its error is returned.
    pub async fn test_dynamic(&self, value_sc: &StorageClassParams, run: &SnapshotRun) -> Result<()> {
        value_sc.validate()?;
        run.validate()?;
        let mut created = Created::default();
        let result = self.dynamic_flow(value_sc, run, &mut created).await;
        self.finish(created, result).await
    }

    async fn dynamic_flow(
        &self,
        value_sc: &StorageClassParams,
        run: &SnapshotRun,
        created: &mut Created,
    ) -> Result<()> {
        let label = run.label.as_str();
        let namespace = self.namespace();
        info!(case = label, "Starting dynamic snapshot scenario");

        let sc = self.create_storage_class(value_sc, label, created).await?;
        let restore_sc = match &run.restore_sc {
            Some(params) => self.create_storage_class(params, label, created).await?,
            None => sc.clone(),
        };
        let class_params = run
            .value_vs_class
            .as_ref()
            .unwrap_or(&self.config.value_vs_class);
        let class = self.create_snapshot_class(class_params, label, created).await?;
        let contents: Api<VolumeSnapshotContent> = Api::all(self.client.clone());

        let count = run
            .number_of_snapshots
            .unwrap_or(self.config.number_of_snapshots);
        let pod_params = run.value_pod.clone().unwrap_or_default();
        let claims = run.value_pvc.as_ref().unwrap_or(&self.config.value_pvc);
        // Consistency group snapshots inside the window are reused, so only
        // classic filesets hit the per-fileset limit.
        let limited = value_sc.storage_class_type() == StorageClassType::Classic;

        for source in claims {
            let claim = unique_name("pvc");
            self.create_claim(&storage::claim(&claim, namespace, source, &sc, label), created)
                .await?;
            self.wait_bound(&claim).await?;
            let writer = self.start_pod(&claim, &pod_params, label, created).await?;
            let marker = self.write_marker(&writer, &pod_params, &claim).await?;

            for size in &source.presnap_volume_expansion_storage {
                self.expand(&claim, size).await?;
            }

            let mut ready = Vec::with_capacity(count.min(MAX_SNAPSHOTS_PER_FILESET));
            for index in 0..count {
                let name = unique_name("snapshot");
                cluster::create(
                    &self.snapshots(),
                    &snapshot::dynamic_snapshot(&name, namespace, &claim, &class, label),
                )
                .await?;
                created.snapshots.push(name.clone());
                let expected_error = expected_snapshot_error(run.reason.as_deref(), index, limited);
                let outcome = self.wait_for_snapshot(&name, expected_error).await;

                let taken = match judge_snapshot(&name, run.reason.as_deref(), index, limited, outcome) {
                    SnapshotStep::Keep(taken) => taken,
                    SnapshotStep::LimitEnforced => continue,
                    SnapshotStep::Stop(result) => return result,
                };
                if class_params.deletion_policy == DeletionPolicy::Retain
                    && let Some(content) = taken
                        .status
                        .as_ref()
                        .and_then(|s| s.bound_volume_snapshot_content_name.clone())
                {
                    // Released to the driver on cleanup so the filesystem snapshot goes too
                    let timeout = self.config.timeouts.snapshot_ready;
                    cluster::wait_for_resource(&contents, &content, timeout)
                        .await
                        .map_err(|e| Error::wait(format!("VolumeSnapshotContent {}", content), e))?;
                    created.retained_contents.push(content);
                }
                ready.push(taken);
            }
            info!(%claim, snapshots = ready.len(), "Snapshots ready");

            for size in &source.postsnap_volume_expansion_storage {
                self.expand(&claim, size).await?;
            }

            if run.test_restore {
                for taken in &ready {
                    self.restore(taken, &restore_sc, source, run, &pod_params, Some(&marker), created)
                        .await?;
                }
            }

            for clone in run.value_clone_passed.iter().flatten() {
                self.clone_claim(&claim, clone, &sc, &pod_params, &marker, label, created)
                    .await?;
            }
        }
        Ok(())
    }

    /// Clone `source` into a new claim and verify the marker file.
    #[allow(clippy::too_many_arguments)]
    async fn clone_claim(
        &self,
        source: &str,
        params: &PvcParams,
        storage_class: &str,
        pod: &PodParams,
        marker: &str,
        label: &str,
        created: &mut Created,
    ) -> Result<()> {
        let name = unique_name("cloned-pvc");
        let claim = storage::claim_from_claim(
            &name,
            self.namespace(),
            params,
            &params.storage,
            storage_class,
            source,
            label,
        );
        self.create_claim(&claim, created).await?;
        self.wait_bound(&name).await?;
        let reader = self.start_pod(&name, pod, label, created).await?;
        self.verify_marker(&reader, pod, &name, marker).await?;
        info!(claim = %name, %source, "Cloned claim");
        Ok(())
    }
}
