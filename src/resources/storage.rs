//! Storage class and claim generation.

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, TypedLocalObjectReference,
    VolumeResourceRequirements,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde_json::json;
use std::collections::BTreeMap;

use crate::driver::DRIVER_NAME;
use crate::params::{PvcParams, StorageClassParams};
use crate::resources::common::{cluster_meta, namespaced_meta};

/// Generate a StorageClass for the driver.
///
/// `namespace` names the automatic consistency group of advanced classes.
pub fn storage_class(
    name: &str,
    params: &StorageClassParams,
    namespace: &str,
    case: &str,
) -> StorageClass {
    StorageClass {
        metadata: cluster_meta(name, case),
        provisioner: DRIVER_NAME.to_string(),
        parameters: Some(params.parameters_for(Some(namespace))),
        reclaim_policy: Some("Delete".to_string()),
        allow_volume_expansion: params.allow_volume_expansion.then_some(true),
        ..Default::default()
    }
}

fn claim_spec(
    params: &PvcParams,
    storage: &str,
    storage_class: &str,
    data_source: Option<TypedLocalObjectReference>,
) -> PersistentVolumeClaimSpec {
    PersistentVolumeClaimSpec {
        access_modes: Some(vec![params.access_modes.to_string()]),
        storage_class_name: Some(storage_class.to_string()),
        resources: Some(VolumeResourceRequirements {
            requests: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity(storage.to_string()),
            )])),
            ..Default::default()
        }),
        data_source,
        ..Default::default()
    }
}

/// Generate an empty claim.
pub fn claim(
    name: &str,
    namespace: &str,
    params: &PvcParams,
    storage_class: &str,
    case: &str,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: namespaced_meta(name, namespace, case),
        spec: Some(claim_spec(params, &params.storage, storage_class, None)),
        ..Default::default()
    }
}

/// Generate a claim restored from a volume snapshot.
///
/// `storage` must be at least the snapshot's restore size.
pub fn claim_from_snapshot(
    name: &str,
    namespace: &str,
    params: &PvcParams,
    storage: &str,
    storage_class: &str,
    snapshot: &str,
    case: &str,
) -> PersistentVolumeClaim {
    let source = TypedLocalObjectReference {
        api_group: Some("snapshot.storage.k8s.io".to_string()),
        kind: "VolumeSnapshot".to_string(),
        name: snapshot.to_string(),
    };
    PersistentVolumeClaim {
        metadata: namespaced_meta(name, namespace, case),
        spec: Some(claim_spec(params, storage, storage_class, Some(source))),
        ..Default::default()
    }
}

/// Generate a claim cloned from another claim.
pub fn claim_from_claim(
    name: &str,
    namespace: &str,
    params: &PvcParams,
    storage: &str,
    storage_class: &str,
    source_claim: &str,
    case: &str,
) -> PersistentVolumeClaim {
    let source = TypedLocalObjectReference {
        api_group: None,
        kind: "PersistentVolumeClaim".to_string(),
        name: source_claim.to_string(),
    };
    PersistentVolumeClaim {
        metadata: namespaced_meta(name, namespace, case),
        spec: Some(claim_spec(params, storage, storage_class, Some(source))),
        ..Default::default()
    }
}

/// Merge patch requesting a new claim size.
pub fn resize_patch(storage: &str) -> serde_json::Value {
    json!({
        "spec": {
            "resources": {
                "requests": {
                    "storage": storage
                }
            }
        }
    })
}

/// Check if a claim is bound.
pub fn is_bound(pvc: &PersistentVolumeClaim) -> bool {
    pvc.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|p| p == "Bound")
}

/// Capacity reported in the claim status.
pub fn capacity(pvc: &PersistentVolumeClaim) -> Option<&str> {
    pvc.status
        .as_ref()
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get("storage"))
        .map(|q| q.0.as_str())
}
