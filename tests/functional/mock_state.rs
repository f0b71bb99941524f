//! Mock driver for simulating snapshot requests in functional tests.
//!
//! `MockDriver` keeps the state a CSI driver would keep on the storage
//! cluster (volumes, snapshot counts per fileset, consistency group snapshot
//! times) and delegates every decision to `scale_snapshot_suite::driver`.

use std::collections::BTreeMap;
use std::time::Duration;

use scale_snapshot_suite::catalog::{CaseKind, SnapshotCase};
use scale_snapshot_suite::driver::rules::{
    self, Rejection, check_node_class, check_restore_cluster, check_snapshot_count,
    check_snapshot_source, reuses_group_snapshot,
};
use scale_snapshot_suite::driver::{SnapshotId, StorageClassType, VolumeId, VolumeType};
use scale_snapshot_suite::params::{SnapshotClassParams, StorageClassParams};

pub const NAMESPACE: &str = "ibm-test-namespace";
pub const FS_UUID: &str = "09E3:61A8";

/// Simulated driver state.
#[derive(Debug, Clone)]
pub struct MockDriver {
    pub cluster_id: String,
    pub node_classes: Vec<String>,
    volumes: BTreeMap<String, VolumeId>,
    snapshots_per_fileset: BTreeMap<String, usize>,
    /// Consistency group -> (time of last snapshot, its name).
    group_snapshots: BTreeMap<String, (Duration, String)>,
    clock: Duration,
    next_snapshot: usize,
}

impl MockDriver {
    pub fn new(cluster_id: &str) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            node_classes: vec!["GUI_MGMT_SERVERS".to_string(), "GUI_SERVERS".to_string()],
            volumes: BTreeMap::new(),
            snapshots_per_fileset: BTreeMap::new(),
            group_snapshots: BTreeMap::new(),
            clock: Duration::ZERO,
            next_snapshot: 0,
        }
    }

    /// Let time pass.
    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    /// Provision a volume for `claim`.
    pub fn provision(&mut self, claim: &str, sc: &StorageClassParams) -> VolumeId {
        let parameters = sc.parameters_for(Some(NAMESPACE));
        let storage_class_type = sc.storage_class_type();
        let volume_type = sc.volume_type();
        let consistency_group = match storage_class_type {
            StorageClassType::Advanced => parameters
                .get("consistencyGroup")
                .cloned()
                .unwrap_or_else(|| format!("{}-cg", NAMESPACE)),
            StorageClassType::Classic => String::new(),
        };
        let fileset_name = if volume_type.is_fileset_based() {
            format!("pvc-{}", claim)
        } else {
            String::new()
        };
        let id = VolumeId {
            storage_class_type,
            volume_type,
            cluster_id: sc.cluster_id.clone().unwrap_or_else(|| self.cluster_id.clone()),
            fs_uuid: FS_UUID.to_string(),
            consistency_group,
            fileset_name,
            path: format!("/ibm/gpfs0/{}", claim),
        };
        self.volumes.insert(claim.to_string(), id.clone());
        id
    }

    pub fn volume(&self, claim: &str) -> Option<&VolumeId> {
        self.volumes.get(claim)
    }

    /// Number of filesystem snapshots held by a fileset.
    pub fn snapshot_count(&self, fileset: &str) -> usize {
        self.snapshots_per_fileset.get(fileset).copied().unwrap_or(0)
    }

    /// Snapshot the volume of `claim` through `class`.
    pub fn snapshot(
        &mut self,
        claim: &str,
        class: &SnapshotClassParams,
    ) -> Result<SnapshotId, Rejection> {
        let volume = self
            .volumes
            .get(claim)
            .cloned()
            .unwrap_or_else(|| panic!("claim {} was never provisioned", claim));
        check_snapshot_source(volume.storage_class_type, volume.volume_type)?;

        let fileset = volume.snapshot_fileset().to_string();
        let snapshot_name = match volume.storage_class_type {
            StorageClassType::Advanced => {
                let window = rules::snap_window(&class.parameters())?;
                match self.group_snapshots.get(&fileset) {
                    Some((taken, name)) if reuses_group_snapshot(self.clock - *taken, window) => {
                        name.clone()
                    }
                    _ => {
                        let name = self.take(&fileset)?;
                        self.group_snapshots
                            .insert(fileset.clone(), (self.clock, name.clone()));
                        name
                    }
                }
            }
            StorageClassType::Classic => self.take(&fileset)?,
        };

        Ok(SnapshotId {
            storage_class_type: volume.storage_class_type,
            volume_type: Some(volume.volume_type),
            cluster_id: volume.cluster_id,
            fs_uuid: volume.fs_uuid,
            consistency_group: volume.consistency_group,
            fileset_name: volume.fileset_name,
            snapshot_name,
            meta_snapshot_name: String::new(),
            path: "/".to_string(),
        })
    }

    fn take(&mut self, fileset: &str) -> Result<String, Rejection> {
        check_snapshot_count("gpfs0", fileset, self.snapshot_count(fileset))?;
        *self.snapshots_per_fileset.entry(fileset.to_string()).or_default() += 1;
        self.next_snapshot += 1;
        Ok(format!("snapshot-{}", self.next_snapshot))
    }

    /// Restore `snapshot` into a new volume for `claim`.
    pub fn restore(
        &mut self,
        snapshot: &SnapshotId,
        claim: &str,
        sc: &StorageClassParams,
    ) -> Result<VolumeId, Rejection> {
        if let Some(node_class) = &sc.node_class {
            let known: Vec<&str> = self.node_classes.iter().map(String::as_str).collect();
            check_node_class(node_class, &known, &self.cluster_id)?;
        }
        let target_cluster = sc.cluster_id.clone().unwrap_or_else(|| self.cluster_id.clone());
        check_restore_cluster(&snapshot.cluster_id, &target_cluster)?;
        Ok(self.provision(claim, sc))
    }
}

/// What a case did in the model.
#[derive(Debug, Default)]
pub struct CaseTrace {
    pub snapshots: Vec<SnapshotId>,
    pub snapshot_failures: Vec<Rejection>,
    pub restores: Vec<VolumeId>,
    pub restore_failures: Vec<Rejection>,
}

/// Run a catalogue case against the model.
///
/// Returns the first rejection that ends the case, as the suite does.
pub fn simulate(
    driver: &mut MockDriver,
    case: &SnapshotCase,
    default_claims: usize,
) -> (CaseTrace, Option<Rejection>) {
    let mut trace = CaseTrace::default();
    let class = case
        .run
        .value_vs_class
        .clone()
        .unwrap_or_else(SnapshotClassParams::delete);
    let count = case.run.number_of_snapshots.unwrap_or(1);
    let claims = case
        .run
        .value_pvc
        .as_ref()
        .map(Vec::len)
        .unwrap_or(default_claims);
    let restore_sc = case.run.restore_sc.clone().unwrap_or_else(|| case.sc.clone());

    for index in 0..claims {
        let claim = format!("{}-{}", case.name, index);
        let snapshots: Vec<SnapshotId> = match case.kind {
            CaseKind::Version => return (trace, None),
            CaseKind::Static => (0..count)
                .map(|n| {
                    SnapshotId::pre_provisioned(
                        &driver.cluster_id,
                        FS_UUID,
                        format!("snapshot-fset-{}", claim),
                        format!("snapshot-{}", n),
                    )
                })
                .collect(),
            CaseKind::Dynamic => {
                driver.provision(&claim, &case.sc);
                let mut taken = Vec::new();
                for _ in 0..count {
                    match driver.snapshot(&claim, &class) {
                        Ok(id) => taken.push(id),
                        Err(rejection) => {
                            trace.snapshot_failures.push(rejection.clone());
                            if case.run.reason.is_some() {
                                return (trace, Some(rejection));
                            }
                        }
                    }
                }
                taken
            }
        };
        trace.snapshots.extend(snapshots.iter().cloned());

        if !case.run.test_restore {
            continue;
        }
        for (n, snapshot) in snapshots.iter().enumerate() {
            match driver.restore(snapshot, &format!("{}-restore-{}", claim, n), &restore_sc) {
                Ok(volume) => trace.restores.push(volume),
                Err(rejection) => trace.restore_failures.push(rejection),
            }
        }
    }
    (trace, None)
}

/// Volume types a storage class can provision, for readable assertions.
pub fn is_snapshot_capable(sc: &StorageClassParams) -> bool {
    matches!(
        (sc.storage_class_type(), sc.volume_type()),
        (StorageClassType::Classic, VolumeType::IndependentFileset)
            | (StorageClassType::Advanced, VolumeType::DependentFileset)
    )
}
