//! Decisions the scenarios take from what the cluster reports.
//!
//! Nothing here talks to the cluster, so every branch a scenario can take on
//! a snapshot or a restore is decided by these functions.

use tracing::{info, warn};

use crate::crd::VolumeSnapshot;
use crate::driver::MAX_SNAPSHOTS_PER_FILESET;
use crate::driver::rules::SNAPSHOT_LIMIT_REACHED;
use crate::error::{Error, Result};
use crate::params::{PvcParams, parse_quantity};
use crate::suite::SnapshotRun;

/// What a dynamic run does with one snapshot.
#[derive(Debug)]
pub enum SnapshotStep<T> {
    /// Ready; restores and clones use it.
    Keep(T),
    /// Refused past the per-fileset limit.
    LimitEnforced,
    /// End the run with this result.
    Stop(Result<()>),
}

/// Error text snapshot number `index` is allowed to end with.
///
/// `limited` is set when the source fileset counts against the snapshot
/// limit.
pub fn expected_snapshot_error(reason: Option<&str>, index: usize, limited: bool) -> Option<&str> {
    match reason {
        Some(reason) => Some(reason),
        None if limited && index >= MAX_SNAPSHOTS_PER_FILESET => Some(SNAPSHOT_LIMIT_REACHED),
        None => None,
    }
}

/// Whether waiting on a snapshot can stop.
///
/// An error only ends the wait when it is the expected one. The snapshot
/// controller also records transient errors, which it clears once the
/// snapshot becomes ready.
pub fn snapshot_settled(snapshot: &VolumeSnapshot, expected_error: Option<&str>) -> bool {
    snapshot.is_ready()
        || snapshot
            .error_message()
            .zip(expected_error)
            .is_some_and(|(message, expected)| message.contains(expected))
}

/// Turn a settled snapshot into its outcome.
pub fn snapshot_outcome(name: &str, snapshot: VolumeSnapshot) -> Result<VolumeSnapshot> {
    if !snapshot.is_ready()
        && let Some(message) = snapshot.error_message()
    {
        return Err(Error::SnapshotFailed {
            name: name.to_string(),
            message: message.to_string(),
        });
    }
    Ok(snapshot)
}

/// Decide how a dynamic run continues after snapshot number `index`.
pub fn judge_snapshot<T>(
    name: &str,
    reason: Option<&str>,
    index: usize,
    limited: bool,
    outcome: Result<T>,
) -> SnapshotStep<T> {
    let missing = |reason: &str| {
        SnapshotStep::Stop(Err(Error::ExpectedFailureMissing {
            resource: format!("VolumeSnapshot {}", name),
            reason: reason.to_string(),
        }))
    };

    if let Some(reason) = reason {
        return match outcome {
            Ok(_) => missing(reason),
            Err(e) => {
                if e.matches_reason(reason) {
                    info!(snapshot = name, reason, "Snapshot failed as expected");
                } else {
                    warn!(snapshot = name, error = %e, "Snapshot failed for another reason");
                }
                SnapshotStep::Stop(Err(e))
            }
        };
    }

    if limited && index >= MAX_SNAPSHOTS_PER_FILESET {
        return match outcome {
            Err(e) if e.matches_reason(SNAPSHOT_LIMIT_REACHED) => {
                info!(snapshot = name, index, "Snapshot limit enforced");
                SnapshotStep::LimitEnforced
            }
            Ok(_) => missing(SNAPSHOT_LIMIT_REACHED),
            Err(e) => SnapshotStep::Stop(Err(e)),
        };
    }

    match outcome {
        Ok(taken) => SnapshotStep::Keep(taken),
        Err(e) => SnapshotStep::Stop(Err(e)),
    }
}

/// Parameters of the claim restored from `snapshot` of `source`.
///
/// An explicit restore claim of the run wins. Otherwise the source access
/// mode is kept with the size from [`restore_storage`].
pub fn restore_claim_params(run: &SnapshotRun, source: &PvcParams, snapshot: &VolumeSnapshot) -> PvcParams {
    match &run.restore_pvc {
        Some(pvc) => pvc.clone(),
        None => PvcParams::new(source.access_modes, restore_storage(snapshot, source.size_at_snapshot())),
    }
}

/// Size for a claim restored from `snapshot`.
///
/// The snapshot restore size wins when it is at least `fallback`.
pub fn restore_storage(snapshot: &VolumeSnapshot, fallback: &str) -> String {
    let fallback_bytes = parse_quantity(fallback).unwrap_or(0);
    match snapshot.restore_size() {
        Some(size) if parse_quantity(size).is_ok_and(|b| b >= fallback_bytes) => size.to_string(),
        _ => fallback.to_string(),
    }
}

/// Failure message of a claim that never bound, from its events.
pub fn claim_failure(name: &str, events: &[String]) -> Option<Error> {
    events
        .iter()
        .rev()
        .find(|m| m.contains("failed to provision") || m.contains("rpc error"))
        .map(|message| Error::ClaimFailed {
            name: name.to_string(),
            message: message.clone(),
        })
}
