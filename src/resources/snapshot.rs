//! Snapshot object generation.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::core::TypeMeta;
use serde_json::json;

use crate::crd::{
    VolumeSnapshot, VolumeSnapshotClass, VolumeSnapshotContent, VolumeSnapshotContentSource,
    VolumeSnapshotContentSpec, VolumeSnapshotSource, VolumeSnapshotSpec,
};
use crate::driver::{DRIVER_NAME, SnapshotId};
use crate::params::{DeletionPolicy, SnapshotClassParams};
use crate::resources::common::{cluster_meta, namespaced_meta};

/// Generate a snapshot class for the driver.
pub fn snapshot_class(name: &str, params: &SnapshotClassParams, case: &str) -> VolumeSnapshotClass {
    VolumeSnapshotClass {
        types: Some(TypeMeta {
            api_version: "snapshot.storage.k8s.io/v1".to_string(),
            kind: "VolumeSnapshotClass".to_string(),
        }),
        metadata: cluster_meta(name, case),
        driver: DRIVER_NAME.to_string(),
        deletion_policy: params.deletion_policy.to_string(),
        parameters: params.parameters(),
    }
}

/// Generate a snapshot of `claim` taken through `class`.
pub fn dynamic_snapshot(
    name: &str,
    namespace: &str,
    claim: &str,
    class: &str,
    case: &str,
) -> VolumeSnapshot {
    VolumeSnapshot {
        metadata: namespaced_meta(name, namespace, case),
        spec: VolumeSnapshotSpec {
            source: VolumeSnapshotSource {
                persistent_volume_claim_name: Some(claim.to_string()),
                volume_snapshot_content_name: None,
            },
            volume_snapshot_class_name: Some(class.to_string()),
        },
        status: None,
    }
}

/// Generate the content registering a snapshot that exists on the filesystem.
///
/// Pre-provisioned content is always retained; the suite removes the
/// filesystem snapshot itself.
pub fn pre_provisioned_content(
    name: &str,
    handle: &SnapshotId,
    snapshot_name: &str,
    namespace: &str,
    case: &str,
) -> VolumeSnapshotContent {
    VolumeSnapshotContent {
        metadata: cluster_meta(name, case),
        spec: VolumeSnapshotContentSpec {
            deletion_policy: "Retain".to_string(),
            driver: DRIVER_NAME.to_string(),
            source: VolumeSnapshotContentSource {
                snapshot_handle: Some(handle.to_string()),
                volume_handle: None,
            },
            volume_snapshot_class_name: None,
            source_volume_mode: Some("Filesystem".to_string()),
            volume_snapshot_ref: ObjectReference {
                name: Some(snapshot_name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
        },
        status: None,
    }
}

/// Generate a snapshot bound to pre-provisioned content.
pub fn pre_provisioned_snapshot(
    name: &str,
    namespace: &str,
    content: &str,
    case: &str,
) -> VolumeSnapshot {
    VolumeSnapshot {
        metadata: namespaced_meta(name, namespace, case),
        spec: VolumeSnapshotSpec {
            source: VolumeSnapshotSource {
                persistent_volume_claim_name: None,
                volume_snapshot_content_name: Some(content.to_string()),
            },
            volume_snapshot_class_name: None,
        },
        status: None,
    }
}

/// Merge patch setting the deletion policy of a snapshot content.
pub fn deletion_policy_patch(policy: DeletionPolicy) -> serde_json::Value {
    json!({
        "spec": {
            "deletionPolicy": policy.to_string()
        }
    })
}
