//! Case execution and outcome bookkeeping.

use std::fmt;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::catalog::{CaseKind, Selection, SnapshotCase};
use crate::error::Result;
use crate::suite::SnapshotSuite;

/// Result of one case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed(String),
    /// Failed as its marker expects.
    XFailed(String),
    /// Passed although a failure was expected.
    XPassed,
    Skipped(String),
}

impl CaseOutcome {
    /// Map a case result onto an outcome, honouring the expected-failure marker.
    ///
    /// An expected failure only counts when the snapshot failed with the
    /// reason of the run. Any other error fails the case.
    pub fn from_result(case: &SnapshotCase, result: &Result<()>) -> Self {
        match result {
            Ok(()) if case.expects_failure() => CaseOutcome::XPassed,
            Ok(()) => CaseOutcome::Passed,
            Err(e) if case.expects_failure() && case.run.fails_as_expected(e) => {
                CaseOutcome::XFailed(e.to_string())
            }
            Err(e) => CaseOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_) | CaseOutcome::XPassed)
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseOutcome::Passed => write!(f, "PASSED"),
            CaseOutcome::Failed(_) => write!(f, "FAILED"),
            CaseOutcome::XFailed(_) => write!(f, "XFAIL"),
            CaseOutcome::XPassed => write!(f, "XPASS"),
            CaseOutcome::Skipped(_) => write!(f, "SKIPPED"),
        }
    }
}

/// Why the filesystem cannot run a case, if it cannot.
pub fn unsupported(suite: &SnapshotSuite, case: &SnapshotCase) -> Option<String> {
    let version = suite.scale_version()?;
    case.required_features()
        .into_iter()
        .find(|f| !version.supports(*f))
        .map(|f| f.unsupported_message())
}

/// Run one case.
pub async fn run_case(suite: &SnapshotSuite, case: &SnapshotCase) -> CaseOutcome {
    if let Some(reason) = unsupported(suite, case) {
        return CaseOutcome::Skipped(reason);
    }

    let started = Instant::now();
    info!(case = %case.name, "Running case");
    let result = match case.kind {
        CaseKind::Version => suite.version_report().await.map(|_| ()),
        CaseKind::Static => suite.test_static(&case.sc, &case.run).await,
        CaseKind::Dynamic => suite.test_dynamic(&case.sc, &case.run).await,
    };
    let outcome = CaseOutcome::from_result(case, &result);
    let elapsed = started.elapsed().as_secs();

    match &outcome {
        CaseOutcome::Failed(message) => error!(case = %case.name, elapsed, %message, "Case failed"),
        CaseOutcome::XPassed => warn!(case = %case.name, elapsed, "Case passed unexpectedly"),
        _ => info!(case = %case.name, elapsed, %outcome, "Case finished"),
    }
    outcome
}

/// Outcome counts of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    pub skipped: usize,
    /// Names and messages of failed and unexpectedly passed cases.
    pub failures: Vec<(String, String)>,
}

impl Summary {
    pub fn record(&mut self, name: &str, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed(message) => {
                self.failed += 1;
                self.failures.push((name.to_string(), message.clone()));
            }
            CaseOutcome::XFailed(_) => self.xfailed += 1,
            CaseOutcome::XPassed => {
                self.xpassed += 1;
                self.failures
                    .push((name.to_string(), "expected failure did not occur".to_string()));
            }
            CaseOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.xfailed + self.xpassed + self.skipped
    }

    /// No case failed or passed unexpectedly.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.xpassed == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} xfailed, {} xpassed, {} skipped",
            self.passed, self.failed, self.xfailed, self.xpassed, self.skipped
        )
    }
}

/// Run every selected case in order.
pub async fn run_selection(suite: &SnapshotSuite, cases: &[SnapshotCase], selection: &Selection) -> Summary {
    let mut summary = Summary::default();
    for case in cases.iter().filter(|c| selection.selects(c)) {
        let outcome = match selection.skip_reason(case) {
            Some(reason) => CaseOutcome::Skipped(reason),
            None => run_case(suite, case).await,
        };
        summary.record(&case.name, &outcome);
    }
    info!(%summary, "Run complete");
    summary
}
