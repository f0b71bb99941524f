//! scale-snapshot-suite library crate
//!
//! Functional tests of the volume snapshot support of the IBM Spectrum Scale
//! CSI driver: snapshot scenarios, the cases built on them and the cluster
//! plumbing they need.

pub mod catalog;
pub mod cluster;
pub mod config;
pub mod crd;
pub mod driver;
pub mod error;
pub mod params;
pub mod resources;
pub mod runner;
pub mod scale;
pub mod suite;

pub use catalog::{CaseKind, Marker, Selection, SnapshotCase, catalog};
pub use error::{Error, Result};
pub use runner::{CaseOutcome, Summary, run_case, run_selection};
pub use suite::{SnapshotRun, SnapshotSuite};

use tracing_subscriber::EnvFilter;

/// Default log filter of the CLI.
pub const DEFAULT_LOG_FILTER: &str = "scale_snapshot_suite=info,kube=warn";

/// Log filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
