// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Integration tests for scale-snapshot-suite
//!
//! These tests require a running Kubernetes cluster with the Spectrum Scale
//! CSI driver installed, accessible via kubeconfig, and a driver data file
//! describing the storage cluster. Tests are marked with #[ignore] and must be
//! run explicitly:
//!
//! ```bash
//! # Run every case
//! SCALE_TEST_CONFIG=config/test.config cargo test --test integration -- --ignored
//!
//! # Run one case
//! cargo test --test integration test_snapshot_cg_pass_1 -- --ignored
//!
//! # Include the slow cases
//! SCALE_RUNSLOW=true cargo test --test integration -- --ignored
//! ```
//!
//! ## Design Principles
//!
//! - **Parallel Test Execution**: Each test runs its case in its own namespace,
//!   so automatic consistency groups never collide
//! - **RAII Cleanup**: TestNamespace implements Drop for automatic cleanup even on panic
//! - **Same Code Path**: Every test runs its case through the runner the CLI uses

// Shared test fixtures (used by unit, functional, and integration)
#[path = "../common/mod.rs"]
mod common;

mod cluster;
pub mod fixtures;
mod namespace;

// Test modules
mod cluster_tests;

pub use assertions::*;
pub use cluster::*;
pub use fixtures::*;
pub use namespace::*;
