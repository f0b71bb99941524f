//! Snapshot rules enforced by the driver's controller service.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{StorageClassType, VolumeType};
use crate::params::StorageClassParams;

/// Storage class parameter keys the driver accepts.
pub const SUPPORTED_SC_PARAMETERS: &[&str] = &[
    "csi.storage.k8s.io/pv/name",
    "csi.storage.k8s.io/pvc/name",
    "csi.storage.k8s.io/pvc/namespace",
    "storage.kubernetes.io/csiProvisionerIdentity",
    "volBackendFs",
    "volDirBasePath",
    "uid",
    "gid",
    "permissions",
    "clusterId",
    "filesetType",
    "parentFileset",
    "inodeLimit",
    "nodeClass",
    "version",
    "tier",
    "compression",
    "consistencyGroup",
    "shared",
];

/// Filesystem limit on snapshots of a single fileset.
pub const MAX_SNAPSHOTS_PER_FILESET: usize = 256;

/// Snapshot window applied to consistency groups when the class sets none.
pub const DEFAULT_SNAP_WINDOW_MINUTES: u32 = 30;

pub const INDEPENDENT_FILESET_REQUIRED: &str =
    "Volume snapshot can only be created when source volume is independent fileset";

pub const SNAPSHOT_LIMIT_REACHED: &str = "max limit of snapshots reached";

/// gRPC status code of a rejected request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Code {
    InvalidArgument,
    NotFound,
    OutOfRange,
    Unimplemented,
    Internal,
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Code::InvalidArgument => write!(f, "InvalidArgument"),
            Code::NotFound => write!(f, "NotFound"),
            Code::OutOfRange => write!(f, "OutOfRange"),
            Code::Unimplemented => write!(f, "Unimplemented"),
            Code::Internal => write!(f, "Internal"),
        }
    }
}

/// A request the driver refuses, rendered the way it surfaces in events.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    pub code: Code,
    pub message: String,
}

impl Rejection {
    fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error: code = {} desc = {}", self.code, self.message)
    }
}

/// Check that a volume of this kind can be snapshotted.
pub fn check_snapshot_source(
    storage_class_type: StorageClassType,
    volume_type: VolumeType,
) -> Result<(), Rejection> {
    match (storage_class_type, volume_type) {
        (_, VolumeType::Directory) => Err(Rejection::new(
            Code::InvalidArgument,
            INDEPENDENT_FILESET_REQUIRED,
        )),
        (StorageClassType::Advanced, VolumeType::DependentFileset) => Ok(()),
        (StorageClassType::Advanced, _) => Err(Rejection::new(
            Code::InvalidArgument,
            "Volume snapshot can only be created when source volume is dependent fileset for new storageClass",
        )),
        (StorageClassType::Classic, VolumeType::DependentFileset) => Err(Rejection::new(
            Code::InvalidArgument,
            INDEPENDENT_FILESET_REQUIRED,
        )),
        (StorageClassType::Classic, VolumeType::IndependentFileset) => Ok(()),
    }
}

/// Failure reason expected when snapshotting a volume of this storage class.
pub fn expected_snapshot_failure(sc: &StorageClassParams) -> Option<Rejection> {
    check_snapshot_source(sc.storage_class_type(), sc.volume_type()).err()
}

/// Check that one more snapshot fits on a fileset holding `existing` ones.
pub fn check_snapshot_count(
    filesystem: &str,
    fileset: &str,
    existing: usize,
) -> Result<(), Rejection> {
    if existing >= MAX_SNAPSHOTS_PER_FILESET {
        return Err(Rejection::new(
            Code::OutOfRange,
            format!(
                "{} for fileset [{}:{}]. No more snapshots can be created for this fileset.",
                SNAPSHOT_LIMIT_REACHED, filesystem, fileset
            ),
        ));
    }
    Ok(())
}

/// Snapshot window in minutes from snapshot class parameters.
pub fn snap_window(parameters: &BTreeMap<String, String>) -> Result<u32, Rejection> {
    match parameters.get("snapWindow") {
        None => Ok(DEFAULT_SNAP_WINDOW_MINUTES),
        Some(window) => window.parse().map_err(|_| {
            Rejection::new(
                Code::Internal,
                format!("invalid snapWindow value: [{}]", window),
            )
        }),
    }
}

/// Whether a consistency group snapshot taken `age` ago is reused.
pub fn reuses_group_snapshot(age: Duration, window_minutes: u32) -> bool {
    age < Duration::from_secs(u64::from(window_minutes) * 60)
}

/// Check a restore target asks for a node class the cluster knows.
pub fn check_node_class(
    node_class: &str,
    known: &[&str],
    cluster_id: &str,
) -> Result<(), Rejection> {
    if known.contains(&node_class) {
        return Ok(());
    }
    Err(Rejection::new(
        Code::NotFound,
        format!(
            "nodeclass [{}] not found on cluster [{}]",
            node_class, cluster_id
        ),
    ))
}

/// Check a restore stays on the cluster that owns the snapshot.
pub fn check_restore_cluster(snapshot_cluster: &str, volume_cluster: &str) -> Result<(), Rejection> {
    if snapshot_cluster != volume_cluster {
        return Err(Rejection::new(
            Code::Unimplemented,
            "creating volume from snapshot across clusters is not supported",
        ));
    }
    Ok(())
}
