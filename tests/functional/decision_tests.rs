//! Decisions the dynamic scenario takes on each snapshot and restore.

use rstest::rstest;

use scale_snapshot_suite::catalog::{SnapshotCase, catalog, find};
use scale_snapshot_suite::crd::{
    VolumeSnapshot, VolumeSnapshotError, VolumeSnapshotSource, VolumeSnapshotSpec,
    VolumeSnapshotStatus,
};
use scale_snapshot_suite::driver::{MAX_SNAPSHOTS_PER_FILESET, StorageClassType};
use scale_snapshot_suite::driver::rules::{INDEPENDENT_FILESET_REQUIRED, SNAPSHOT_LIMIT_REACHED};
use scale_snapshot_suite::params::{FilesetType, PvcParams, SnapshotClassParams};
use scale_snapshot_suite::runner::CaseOutcome;
use scale_snapshot_suite::suite::{
    SnapshotStep, expected_snapshot_error, judge_snapshot, restore_claim_params, snapshot_outcome,
    snapshot_settled,
};
use scale_snapshot_suite::{Error, Result};

use crate::common::fixtures::{CLUSTER_ID, driver_data};
use crate::mock_state::MockDriver;

fn cases() -> Vec<SnapshotCase> {
    catalog(&driver_data())
}

fn failed(message: &str) -> Result<u32> {
    Err(Error::SnapshotFailed {
        name: "snapshot-1".to_string(),
        message: message.to_string(),
    })
}

fn snapshot(ready: bool, error: Option<&str>, restore_size: Option<&str>) -> VolumeSnapshot {
    let mut snapshot = VolumeSnapshot::new(
        "snapshot-1",
        VolumeSnapshotSpec {
            source: VolumeSnapshotSource {
                persistent_volume_claim_name: Some("pvc-1".to_string()),
                volume_snapshot_content_name: None,
            },
            volume_snapshot_class_name: None,
        },
    );
    snapshot.status = Some(VolumeSnapshotStatus {
        ready_to_use: Some(ready),
        restore_size: restore_size.map(str::to_string),
        error: error.map(|m| VolumeSnapshotError {
            message: Some(m.to_string()),
            time: None,
        }),
        ..Default::default()
    });
    snapshot
}

/// Step label for table assertions.
fn step_name<T>(step: &SnapshotStep<T>) -> &'static str {
    match step {
        SnapshotStep::Keep(_) => "keep",
        SnapshotStep::LimitEnforced => "limit",
        SnapshotStep::Stop(Ok(())) => "stop-ok",
        SnapshotStep::Stop(Err(Error::ExpectedFailureMissing { .. })) => "missing",
        SnapshotStep::Stop(Err(Error::SnapshotFailed { .. })) => "failed",
        SnapshotStep::Stop(Err(_)) => "error",
    }
}

#[rstest]
#[case::expected_reason(Some(INDEPENDENT_FILESET_REQUIRED), 0, false, failed(INDEPENDENT_FILESET_REQUIRED), "failed")]
#[case::wrong_reason(Some(INDEPENDENT_FILESET_REQUIRED), 0, false, failed("quota exceeded"), "failed")]
#[case::unexpected_success(Some(INDEPENDENT_FILESET_REQUIRED), 0, false, Ok(7), "missing")]
#[case::limit_hit(None, MAX_SNAPSHOTS_PER_FILESET, true, failed(SNAPSHOT_LIMIT_REACHED), "limit")]
#[case::limit_not_hit(None, MAX_SNAPSHOTS_PER_FILESET, true, Ok(7), "missing")]
#[case::limit_other_error(None, MAX_SNAPSHOTS_PER_FILESET, true, failed("quota exceeded"), "failed")]
#[case::last_allowed(None, MAX_SNAPSHOTS_PER_FILESET - 1, true, Ok(7), "keep")]
#[case::unlimited(None, MAX_SNAPSHOTS_PER_FILESET + 10, false, Ok(7), "keep")]
#[case::plain_failure(None, 0, true, failed("rpc error: code = Internal"), "failed")]
fn test_snapshot_step(
    #[case] reason: Option<&str>,
    #[case] index: usize,
    #[case] limited: bool,
    #[case] outcome: Result<u32>,
    #[case] expected: &str,
) {
    let step = judge_snapshot("snapshot-1", reason, index, limited, outcome);
    assert_eq!(step_name(&step), expected, "{:?}", step);
    if let SnapshotStep::Keep(taken) = step {
        assert_eq!(taken, 7);
    }
}

#[rstest]
#[case(Some("desc = nodeclass"), 0, true, Some("desc = nodeclass"))]
#[case(None, MAX_SNAPSHOTS_PER_FILESET - 1, true, None)]
#[case(None, MAX_SNAPSHOTS_PER_FILESET, true, Some(SNAPSHOT_LIMIT_REACHED))]
#[case(None, MAX_SNAPSHOTS_PER_FILESET, false, None)]
fn test_expected_snapshot_error(
    #[case] reason: Option<&str>,
    #[case] index: usize,
    #[case] limited: bool,
    #[case] expected: Option<&str>,
) {
    assert_eq!(expected_snapshot_error(reason, index, limited), expected);
}

#[test]
fn test_transient_snapshot_error_does_not_end_the_wait() {
    let conflict = snapshot(false, Some("the object has been modified; please apply your changes"), None);
    assert!(!snapshot_settled(&conflict, None));
    assert!(!snapshot_settled(&conflict, Some(SNAPSHOT_LIMIT_REACHED)));

    // cleared once ready, a stale message does not turn into a failure
    let ready = snapshot(true, Some("the object has been modified"), Some("1Gi"));
    assert!(snapshot_settled(&ready, None));
    assert!(snapshot_outcome("snapshot-1", ready).is_ok());
}

#[test]
fn test_expected_snapshot_error_ends_the_wait() {
    let limited = snapshot(false, Some(SNAPSHOT_LIMIT_REACHED), None);
    assert!(snapshot_settled(&limited, Some(SNAPSHOT_LIMIT_REACHED)));
    let err = snapshot_outcome("snapshot-257", limited).unwrap_err();
    assert!(err.matches_reason(SNAPSHOT_LIMIT_REACHED));
}

/// Drive a dynamic case through the model the way the scenario does.
fn run_dynamic(case: &SnapshotCase) -> (Result<()>, usize) {
    let mut driver = MockDriver::new(CLUSTER_ID);
    driver.provision("source", &case.sc);
    let class = case.run.value_vs_class.clone().unwrap_or_else(SnapshotClassParams::delete);
    let limited = case.sc.storage_class_type() == StorageClassType::Classic;
    let mut kept = 0;
    for index in 0..case.run.number_of_snapshots.unwrap_or(1) {
        let outcome = driver.snapshot("source", &class).map_err(|r| Error::SnapshotFailed {
            name: format!("snapshot-{}", index),
            message: r.to_string(),
        });
        match judge_snapshot("snapshot", case.run.reason.as_deref(), index, limited, outcome) {
            SnapshotStep::Keep(_) => kept += 1,
            SnapshotStep::LimitEnforced => {}
            SnapshotStep::Stop(result) => return (result, kept),
        }
    }
    (Ok(()), kept)
}

#[test]
fn test_expected_fail_cases_xfail_through_the_scenario() {
    let cases = cases();
    for name in ["test_snapshot_dynamic_expected_fail_1", "test_snapshot_dynamic_expected_fail_2"] {
        let case = find(&cases, name).unwrap();
        let (result, kept) = run_dynamic(case);
        assert_eq!(kept, 0);
        assert!(matches!(CaseOutcome::from_result(case, &result), CaseOutcome::XFailed(_)), "{}", name);
    }
}

#[test]
fn test_expected_fail_case_fails_when_the_driver_accepts_the_snapshot() {
    let cases = cases();
    let mut case = find(&cases, "test_snapshot_dynamic_expected_fail_1").unwrap().clone();
    // an independent fileset is accepted by the driver
    case.sc = case.sc.fileset_type(FilesetType::Independent);
    let (result, _) = run_dynamic(&case);
    assert!(matches!(result, Err(Error::ExpectedFailureMissing { .. })));
    let outcome = CaseOutcome::from_result(&case, &result);
    assert!(matches!(outcome, CaseOutcome::Failed(_)));
    assert!(outcome.is_failure());
}

#[test]
fn test_257th_snapshot_is_refused_and_the_case_passes() {
    let cases = cases();
    let case = find(&cases, "test_snapshot_dynamic_multiple_snapshots_257").unwrap();
    let (result, kept) = run_dynamic(case);
    assert!(result.is_ok());
    assert_eq!(kept, MAX_SNAPSHOTS_PER_FILESET);
    assert_eq!(CaseOutcome::from_result(case, &result), CaseOutcome::Passed);
}

#[test]
fn test_restore_claim_uses_run_claim_when_given() {
    let cases = cases();
    let case = find(&cases, "test_snapshot_dynamic_nodeclass_3").unwrap();
    let source = PvcParams::rwx_1gi();
    let params = restore_claim_params(&case.run, &source, &snapshot(true, None, Some("1Gi")));
    assert_eq!(Some(&params), case.run.restore_pvc.as_ref());
    assert!(params.reason.is_some());
}

#[test]
fn test_restore_claim_covers_presnap_expansion() {
    let cases = cases();
    let case = find(&cases, "test_snapshot_dynamic_volume_expansion_1").unwrap();
    let source = &case.run.value_pvc.as_ref().unwrap()[0];

    // restore size reported before the expansion reached the snapshot
    let params = restore_claim_params(&case.run, source, &snapshot(true, None, Some("1Gi")));
    assert_eq!(params.storage, "2Gi");
    assert_eq!(params.access_modes, source.access_modes);
    assert!(params.post_presnap_volume_expansion_storage.is_empty());

    let params = restore_claim_params(&case.run, source, &snapshot(true, None, Some("3Gi")));
    assert_eq!(params.storage, "3Gi");
}
