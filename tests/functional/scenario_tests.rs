//! Snapshot scenarios driven step by step through the model.

use std::time::Duration;

use scale_snapshot_suite::driver::rules::{Code, INDEPENDENT_FILESET_REQUIRED, SNAPSHOT_LIMIT_REACHED};
use scale_snapshot_suite::driver::{MAX_SNAPSHOTS_PER_FILESET, SnapshotId, StorageClassType};
use scale_snapshot_suite::params::{
    ConsistencyGroup, FilesetType, SnapshotClassParams, StorageClassParams,
};

use crate::common::fixtures::CLUSTER_ID;
use crate::mock_state::{MockDriver, NAMESPACE, is_snapshot_capable};

fn classic() -> StorageClassParams {
    StorageClassParams::on_filesystem("gpfs0").cluster_id(CLUSTER_ID)
}

fn advanced() -> StorageClassParams {
    StorageClassParams::on_filesystem("gpfs0").version("2")
}

#[test]
fn test_independent_fileset_snapshot_and_restore() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("source", &classic());

    let snapshot = driver.snapshot("source", &SnapshotClassParams::delete()).unwrap();
    assert_eq!(snapshot.fileset_name, "pvc-source");
    assert_eq!(driver.snapshot_count("pvc-source"), 1);

    let restored = driver.restore(&snapshot, "restored", &classic()).unwrap();
    assert_eq!(restored.cluster_id, CLUSTER_ID);
    assert_eq!(driver.volume("restored"), Some(&restored));
}

#[test]
fn test_directory_and_dependent_volumes_are_rejected() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    let light_weight = StorageClassParams::on_filesystem("gpfs0").vol_dir_base_path("LW");
    let dependent = classic().fileset_type(FilesetType::Dependent);

    for (claim, sc) in [("lw", light_weight), ("dep", dependent)] {
        assert!(!is_snapshot_capable(&sc));
        driver.provision(claim, &sc);
        let rejection = driver.snapshot(claim, &SnapshotClassParams::delete()).unwrap_err();
        assert_eq!(rejection.code, Code::InvalidArgument);
        assert_eq!(rejection.message, INDEPENDENT_FILESET_REQUIRED);
    }
}

#[test]
fn test_snapshot_limit_per_fileset() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("full", &classic());
    driver.provision("other", &classic());
    let class = SnapshotClassParams::delete();

    for _ in 0..MAX_SNAPSHOTS_PER_FILESET {
        driver.snapshot("full", &class).unwrap();
    }
    let rejection = driver.snapshot("full", &class).unwrap_err();
    assert_eq!(rejection.code, Code::OutOfRange);
    assert!(rejection.to_string().contains(SNAPSHOT_LIMIT_REACHED));
    assert!(rejection.message.contains("[gpfs0:pvc-full]"));

    // The limit is per fileset.
    assert!(driver.snapshot("other", &class).is_ok());
}

#[test]
fn test_consistency_group_snapshot_is_reused_within_window() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    let sc = advanced().consistency_group(ConsistencyGroup::Auto);
    let volume = driver.provision("a", &sc);
    driver.provision("b", &sc);
    assert_eq!(volume.storage_class_type, StorageClassType::Advanced);
    assert_eq!(volume.consistency_group, format!("{}-cg", NAMESPACE));

    let class = SnapshotClassParams::delete().snap_window("2");
    let first = driver.snapshot("a", &class).unwrap();
    driver.advance(Duration::from_secs(60));
    let second = driver.snapshot("b", &class).unwrap();
    assert_eq!(first.snapshot_name, second.snapshot_name);
    assert_eq!(driver.snapshot_count(&volume.consistency_group), 1);

    driver.advance(Duration::from_secs(61));
    let third = driver.snapshot("a", &class).unwrap();
    assert_ne!(first.snapshot_name, third.snapshot_name);
    assert_eq!(driver.snapshot_count(&volume.consistency_group), 2);
}

#[test]
fn test_default_window_is_thirty_minutes() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("a", &advanced());
    let class = SnapshotClassParams::delete();

    let first = driver.snapshot("a", &class).unwrap();
    driver.advance(Duration::from_secs(29 * 60));
    assert_eq!(driver.snapshot("a", &class).unwrap().snapshot_name, first.snapshot_name);
    driver.advance(Duration::from_secs(60));
    assert_ne!(driver.snapshot("a", &class).unwrap().snapshot_name, first.snapshot_name);
}

#[test]
fn test_invalid_snap_window_is_rejected() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("a", &advanced());
    let rejection = driver
        .snapshot("a", &SnapshotClassParams::delete().snap_window("soon"))
        .unwrap_err();
    assert_eq!(rejection.code, Code::Internal);
    assert!(rejection.message.contains("snapWindow"));
}

#[test]
fn test_restore_across_clusters_is_rejected() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    let snapshot = SnapshotId::pre_provisioned("1111", "09E3:61A8", "fset1", "snap1");
    let rejection = driver.restore(&snapshot, "restored", &classic()).unwrap_err();
    assert_eq!(rejection.code, Code::Unimplemented);
}

#[test]
fn test_unknown_node_class_is_rejected() {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("source", &classic());
    let snapshot = driver.snapshot("source", &SnapshotClassParams::delete()).unwrap();

    let known = classic().node_class("GUI_SERVERS");
    assert!(driver.restore(&snapshot, "ok", &known).is_ok());

    let unknown = classic().node_class("randomnodeclassx");
    let rejection = driver.restore(&snapshot, "bad", &unknown).unwrap_err();
    assert_eq!(rejection.code, Code::NotFound);
    assert!(rejection.to_string().contains("NotFound desc = nodeclass"));
    assert!(driver.volume("bad").is_none());
}
