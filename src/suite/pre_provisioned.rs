//! Snapshots created on the filesystem and registered with Kubernetes.

use kube::Api;
use tracing::{debug, info};

use crate::cluster;
use crate::crd::VolumeSnapshotContent;
use crate::driver::SnapshotId;
use crate::error::{Error, Result};
use crate::params::{AccessMode, PvcParams, StorageClassParams};
use crate::resources::{snapshot, unique_name};
use crate::suite::{Created, SnapshotRun, SnapshotSuite};

const FILESET_NAME_ATTEMPTS: usize = 5;

impl SnapshotSuite {
    /// Register filesystem snapshots as pre-provisioned content.
    ///
    /// An independent fileset and the snapshots are created through the
    /// management API. Restored claims use `run.restore_sc` or `value_sc`
    /// and must bind and mount; their content is not checked.
    pub async fn test_static(&self, value_sc: &StorageClassParams, run: &SnapshotRun) -> Result<()> {
        value_sc.validate()?;
        run.validate()?;
        let mut created = Created::default();
        let result = self.static_flow(value_sc, run, &mut created).await;
        self.finish(created, result).await
    }

    async fn static_flow(
        &self,
        value_sc: &StorageClassParams,
        run: &SnapshotRun,
        created: &mut Created,
    ) -> Result<()> {
        let label = run.label.as_str();
        let namespace = self.namespace();
        let fs = value_sc
            .vol_backend_fs
            .clone()
            .unwrap_or_else(|| self.config.primary_fs.clone());
        info!(case = label, %fs, "Starting static snapshot scenario");

        let fs_uuid = self.scale.filesystem_uuid(&fs).await?;
        let fileset = self.free_fileset_name(&fs).await?;
        self.scale
            .create_fileset(&fs, &fileset, &self.config.inode_limit)
            .await?;
        created.filesets.push((fs.clone(), fileset.clone()));

        let count = run
            .number_of_snapshots
            .unwrap_or(self.config.number_of_snapshots);
        let contents: Api<VolumeSnapshotContent> = Api::all(self.client.clone());
        let mut ready = Vec::with_capacity(count);
        for _ in 0..count {
            let fs_snapshot = unique_name("snapshot");
            self.scale
                .create_snapshot(&fs, &fileset, &fs_snapshot)
                .await?;
            created
                .scale_snapshots
                .push((fs.clone(), fileset.clone(), fs_snapshot.clone()));

            let handle = SnapshotId::pre_provisioned(&self.config.cluster_id, &fs_uuid, &fileset, &fs_snapshot);
            let content_name = unique_name("snapcontent");
            let snapshot_name = unique_name("vs");
            cluster::create(
                &contents,
                &snapshot::pre_provisioned_content(&content_name, &handle, &snapshot_name, namespace, label),
            )
            .await?;
            created.contents.push(content_name.clone());
            cluster::create(
                &self.snapshots(),
                &snapshot::pre_provisioned_snapshot(&snapshot_name, namespace, &content_name, label),
            )
            .await?;
            created.snapshots.push(snapshot_name.clone());

            ready.push(self.wait_for_snapshot(&snapshot_name, None).await?);
            info!(snapshot = %snapshot_name, %handle, "Pre-provisioned snapshot ready");
        }

        let listed = self.scale.list_snapshots(&fs, &fileset).await?;
        if listed.len() != count {
            return Err(Error::Validation(format!(
                "fileset {} holds {} snapshots, expected {}",
                fileset,
                listed.len(),
                count
            )));
        }

        if !run.test_restore {
            return Ok(());
        }

        let restore_params = run.restore_sc.as_ref().unwrap_or(value_sc);
        let restore_sc = self.create_storage_class(restore_params, label, created).await?;

        let source = PvcParams::new(AccessMode::ReadWriteMany, "1Gi");
        let pod = run.value_pod.clone().unwrap_or_default();
        for taken in &ready {
            self.restore(taken, &restore_sc, &source, run, &pod, None, created)
                .await?;
        }
        Ok(())
    }

    /// A fileset name not yet used on `fs`.
    async fn free_fileset_name(&self, fs: &str) -> Result<String> {
        for _ in 0..FILESET_NAME_ATTEMPTS {
            let name = unique_name("snapshot-fset");
            if !self.scale.fileset_exists(fs, &name).await? {
                return Ok(name);
            }
            debug!(fs, fileset = %name, "Fileset name taken");
        }
        Err(Error::Validation(format!("no free fileset name found on {}", fs)))
    }
}
