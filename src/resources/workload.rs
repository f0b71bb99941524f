//! Test pod generation.

use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaimVolumeSource, Pod, PodSpec, Volume, VolumeMount,
};
use std::collections::BTreeMap;

use crate::params::PodParams;
use crate::resources::common::{CLAIM_LABEL, namespaced_meta};

/// Name of the claim volume inside test pods.
const VOLUME_NAME: &str = "scale-volume";

/// File written to source volumes and read back from restores and clones.
pub const MARKER_FILE: &str = "snapshot-marker.txt";

/// Generate a pod mounting `claim` according to `params`.
pub fn pod(
    name: &str,
    namespace: &str,
    claim: &str,
    image: &str,
    params: &PodParams,
    node_selector: &BTreeMap<String, String>,
    case: &str,
) -> Pod {
    let mut metadata = namespaced_meta(name, namespace, case);
    if let Some(labels) = metadata.labels.as_mut() {
        labels.insert(CLAIM_LABEL.to_string(), claim.to_string());
    }

    let mut mounts = vec![VolumeMount {
        name: VOLUME_NAME.to_string(),
        mount_path: params.mount_path.clone(),
        read_only: params.read_only.then_some(true),
        ..Default::default()
    }];
    for (index, sub_path) in params.sub_path.iter().enumerate() {
        mounts.push(VolumeMount {
            name: VOLUME_NAME.to_string(),
            mount_path: params.sub_path_mount(index),
            sub_path: Some(sub_path.clone()),
            read_only: params.sub_path_read_only(index).then_some(true),
            ..Default::default()
        });
    }

    Pod {
        metadata,
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "web-server".to_string(),
                image: Some(image.to_string()),
                volume_mounts: Some(mounts),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: VOLUME_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim.to_string(),
                    read_only: params.read_only.then_some(true),
                }),
                ..Default::default()
            }]),
            node_selector: if node_selector.is_empty() {
                None
            } else {
                Some(node_selector.clone())
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Check if a pod is running.
pub fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|p| p == "Running")
}

/// Shell command writing `content` to the marker file.
pub fn write_marker_command(params: &PodParams, content: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "printf '%s' '{}' > {}/{}",
            content,
            params.mount_path.trim_end_matches('/'),
            MARKER_FILE
        ),
    ]
}

/// Shell command printing the marker file.
pub fn read_marker_command(params: &PodParams) -> Vec<String> {
    vec![
        "cat".to_string(),
        format!("{}/{}", params.mount_path.trim_end_matches('/'), MARKER_FILE),
    ]
}
