//! Tracking and removal of the objects a run creates.

use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::Api;
use kube::api::{Patch, PatchParams};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cluster::{delete, delete_and_wait, delete_labeled};
use crate::crd::{VolumeSnapshot, VolumeSnapshotClass, VolumeSnapshotContent};
use crate::error::{Error, Result};
use crate::params::DeletionPolicy;
use crate::resources::common::case_selector;
use crate::resources::snapshot::deletion_policy_patch;
use crate::scale::ScaleClient;

/// Tries per cleanup step for errors that may go away.
const CLEANUP_ATTEMPTS: u32 = 3;

/// Objects created by one run, in creation order.
#[derive(Debug, Default)]
pub struct Created {
    pub pods: Vec<String>,
    pub claims: Vec<String>,
    pub snapshots: Vec<String>,
    pub contents: Vec<String>,
    /// Contents of dynamic snapshots kept by a Retain class.
    pub retained_contents: Vec<String>,
    pub snapshot_classes: Vec<String>,
    pub storage_classes: Vec<String>,
    /// `(filesystem, fileset, snapshot)` created through the REST API.
    pub scale_snapshots: Vec<(String, String, String)>,
    /// `(filesystem, fileset)` created through the REST API.
    pub filesets: Vec<(String, String)>,
}

impl Created {
    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
            && self.claims.is_empty()
            && self.snapshots.is_empty()
            && self.contents.is_empty()
            && self.retained_contents.is_empty()
            && self.snapshot_classes.is_empty()
            && self.storage_classes.is_empty()
            && self.scale_snapshots.is_empty()
            && self.filesets.is_empty()
    }
}

fn keep_first(first: &mut Option<Error>, result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, "Cleanup step failed");
        if first.is_none() {
            *first = Some(e);
        }
    }
}

/// Run a cleanup step, repeating it while it fails with a retryable error.
async fn retried<F, Fut>(step: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 1;
    loop {
        match step().await {
            Err(e) if e.is_retryable() && attempt < CLEANUP_ATTEMPTS => {
                debug!(error = %e, attempt, "Retrying cleanup step");
                tokio::time::sleep(e.retry_after()).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Hand a retained content back to the driver and delete it.
///
/// With the policy switched to Delete the driver removes the filesystem
/// snapshot, which lets the source volume be deleted afterwards.
async fn release_content(api: &Api<VolumeSnapshotContent>, name: &str, timeout: Duration) -> Result<()> {
    let patch = Patch::Merge(deletion_policy_patch(DeletionPolicy::Delete));
    match api.patch(name, &PatchParams::default(), &patch).await {
        Ok(_) => {}
        Err(kube::Error::Api(e)) if e.code == 404 => return Ok(()),
        Err(e) => return Err(e.into()),
    }
    delete_and_wait(api, name, timeout).await
}

/// Delete everything in `created`, newest first.
///
/// Pods go first so claims can detach, snapshots and their contents before
/// the source claims, Kubernetes objects before the filesets backing them.
/// Every step runs even if an earlier one fails; the first failure is
/// returned.
pub async fn remove(
    client: &kube::Client,
    scale: &ScaleClient,
    namespace: &str,
    created: Created,
    timeout: Duration,
) -> Result<()> {
    let mut first = None;

    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    for name in created.pods.iter().rev() {
        keep_first(&mut first, retried(|| delete_and_wait(&pods, name, timeout)).await);
    }

    let snapshots: Api<VolumeSnapshot> = Api::namespaced(client.clone(), namespace);
    for name in created.snapshots.iter().rev() {
        keep_first(&mut first, retried(|| delete_and_wait(&snapshots, name, timeout)).await);
    }

    let contents: Api<VolumeSnapshotContent> = Api::all(client.clone());
    for name in created.retained_contents.iter().rev() {
        keep_first(&mut first, retried(|| release_content(&contents, name, timeout)).await);
    }
    for name in created.contents.iter().rev() {
        keep_first(&mut first, retried(|| delete_and_wait(&contents, name, timeout)).await);
    }

    let claims: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    for name in created.claims.iter().rev() {
        keep_first(&mut first, retried(|| delete_and_wait(&claims, name, timeout)).await);
    }

    let classes: Api<VolumeSnapshotClass> = Api::all(client.clone());
    for name in created.snapshot_classes.iter().rev() {
        keep_first(&mut first, retried(|| delete(&classes, name)).await);
    }

    let storage_classes: Api<StorageClass> = Api::all(client.clone());
    for name in created.storage_classes.iter().rev() {
        keep_first(&mut first, retried(|| delete(&storage_classes, name)).await);
    }

    for (fs, fileset, snapshot) in created.scale_snapshots.iter().rev() {
        let result = scale.delete_snapshot(fs, fileset, snapshot).await;
        keep_first(&mut first, result.or_else(ignore_missing));
    }

    for (fs, fileset) in created.filesets.iter().rev() {
        let result = scale.delete_fileset(fs, fileset).await;
        keep_first(&mut first, result.or_else(ignore_missing));
    }

    match first {
        Some(e) => Err(e),
        None => {
            info!(namespace, "Cleanup complete");
            Ok(())
        }
    }
}

/// Delete every Kubernetes object labelled with `case`.
///
/// Removes what runs with kept objects left behind. Filesets and filesystem
/// snapshots are not labelled and stay. Returns the number of objects deleted.
pub async fn purge(client: &kube::Client, namespace: &str, case: &str) -> usize {
    let selector = case_selector(case);
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let snapshots: Api<VolumeSnapshot> = Api::namespaced(client.clone(), namespace);
    let contents: Api<VolumeSnapshotContent> = Api::all(client.clone());
    let claims: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    let classes: Api<VolumeSnapshotClass> = Api::all(client.clone());
    let storage_classes: Api<StorageClass> = Api::all(client.clone());

    let deleted = delete_labeled(&pods, &selector).await
        + delete_labeled(&snapshots, &selector).await
        + delete_labeled(&contents, &selector).await
        + delete_labeled(&claims, &selector).await
        + delete_labeled(&classes, &selector).await
        + delete_labeled(&storage_classes, &selector).await;
    if deleted > 0 {
        info!(namespace, case, deleted, "Purged leftover objects");
    }
    deleted
}

fn ignore_missing(e: crate::scale::ScaleError) -> Result<()> {
    if e.is_not_found() { Ok(()) } else { Err(e.into()) }
}
