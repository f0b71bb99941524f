//! Common test fixtures and helpers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use scale_snapshot_suite::config::CommandValues;
use scale_snapshot_suite::catalog::{catalog, find};
use scale_snapshot_suite::{CaseOutcome, Selection, SnapshotSuite, run_case};

use crate::{SharedTestCluster, TestNamespace};

// ============================================================
// Timeout Constants
// ============================================================

/// Short timeout for quick operations.
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for namespace teardown.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================
// Test Initialization
// ============================================================

/// Initialize tracing and return the shared test cluster with a fresh client.
pub async fn init_test() -> (Arc<SharedTestCluster>, Client) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,kube=warn,scale_snapshot_suite=debug")
        .with_test_writer()
        .try_init();

    let cluster = SharedTestCluster::get().await;
    let client = cluster.new_client().await;
    (cluster, client)
}

/// Command values pointing the suite at `namespace`.
pub fn command_values(cluster: &SharedTestCluster, namespace: &str) -> CommandValues {
    CommandValues {
        kubeconfig_value: None,
        test_namespace: namespace.to_string(),
        runslow_val: run_slow(),
        test_config: PathBuf::from(&cluster.test_config),
    }
}

/// Whether slow cases run, from `SCALE_RUNSLOW`.
pub fn run_slow() -> bool {
    std::env::var("SCALE_RUNSLOW").is_ok_and(|v| v == "true" || v == "1")
}

/// Build a suite working in the test namespace.
pub async fn suite_in(cluster: &SharedTestCluster, namespace: &TestNamespace) -> SnapshotSuite {
    let (suite, _) = SnapshotSuite::from_fixture(&command_values(cluster, namespace.name()))
        .await
        .expect("Failed to build the snapshot suite");
    suite
}

/// Run the named catalogue case in its own namespace.
pub async fn run_named_case(name: &str) -> CaseOutcome {
    let (cluster, client) = init_test().await;
    let cases = catalog(&cluster.data);
    let case = find(&cases, name).unwrap_or_else(|| panic!("unknown case {}", name));

    let test_ns = TestNamespace::create(client.clone(), &namespace_prefix(name)).await;
    let suite = suite_in(&cluster, &test_ns).await;

    let selection = Selection {
        run_slow: run_slow(),
        ..Default::default()
    };
    let outcome = match selection.skip_reason(case) {
        Some(reason) => CaseOutcome::Skipped(reason),
        None => run_case(&suite, case).await,
    };

    if !matches!(outcome, CaseOutcome::Skipped(_))
        && !suite.config().keep_objects
    {
        crate::assert_case_cleaned_up(client, test_ns.name(), name).await;
    }
    outcome
}

/// Namespace prefix derived from a case name.
fn namespace_prefix(name: &str) -> String {
    let short = name.trim_start_matches("test_snapshot_").replace('_', "-");
    short.chars().take(40).collect::<String>().trim_end_matches('-').to_string()
}
