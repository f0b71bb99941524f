//! Options of a single snapshot scenario.

use crate::error::{Error, Result};
use crate::params::{PodParams, PvcParams, SnapshotClassParams, StorageClassParams};

/// Options shared by the static and dynamic scenarios.
///
/// Unset options fall back to the suite defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotRun {
    /// Label attached to every object the run creates.
    pub label: String,
    pub test_restore: bool,
    pub number_of_snapshots: Option<usize>,
    pub value_vs_class: Option<SnapshotClassParams>,
    /// Expected snapshot failure; the run returns the snapshot error.
    pub reason: Option<String>,
    pub restore_sc: Option<StorageClassParams>,
    pub restore_pvc: Option<PvcParams>,
    pub value_pod: Option<PodParams>,
    pub value_pvc: Option<Vec<PvcParams>>,
    /// Claims cloned from every source claim.
    pub value_clone_passed: Option<Vec<PvcParams>>,
}

impl SnapshotRun {
    /// Run that restores a claim from every snapshot.
    pub fn restore() -> Self {
        Self {
            test_restore: true,
            ..Default::default()
        }
    }

    /// Run that only takes snapshots.
    pub fn snapshot_only() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn snapshots(mut self, count: usize) -> Self {
        self.number_of_snapshots = Some(count);
        self
    }

    pub fn vs_class(mut self, class: SnapshotClassParams) -> Self {
        self.value_vs_class = Some(class);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn restore_sc(mut self, sc: StorageClassParams) -> Self {
        self.restore_sc = Some(sc);
        self
    }

    pub fn restore_pvc(mut self, pvc: PvcParams) -> Self {
        self.restore_pvc = Some(pvc);
        self
    }

    pub fn pod(mut self, pod: PodParams) -> Self {
        self.value_pod = Some(pod);
        self
    }

    pub fn pvcs(mut self, pvcs: Vec<PvcParams>) -> Self {
        self.value_pvc = Some(pvcs);
        self
    }

    pub fn clones(mut self, clones: Vec<PvcParams>) -> Self {
        self.value_clone_passed = Some(clones);
        self
    }

    /// Check that `error` is the snapshot failure this run expects.
    pub fn fails_as_expected(&self, error: &Error) -> bool {
        matches!(error, Error::SnapshotFailed { .. })
            && self.reason.as_deref().is_some_and(|r| error.matches_reason(r))
    }

    /// Check every parameter set of the run.
    pub fn validate(&self) -> Result<()> {
        if let Some(class) = &self.value_vs_class {
            class.validate()?;
        }
        if let Some(sc) = &self.restore_sc {
            sc.validate()?;
        }
        if let Some(pvc) = &self.restore_pvc {
            pvc.validate()?;
        }
        for pvc in self.value_pvc.iter().flatten() {
            pvc.validate()?;
        }
        for pvc in self.value_clone_passed.iter().flatten() {
            pvc.validate()?;
        }
        Ok(())
    }
}
