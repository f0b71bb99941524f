// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for the snapshot cases.
//!
//! These tests run every case of the catalogue against an in-memory model of
//! the CSI driver WITHOUT requiring a live cluster. The model only tracks
//! volumes, filesets and snapshots; every accept/reject decision is made by
//! the crate's own driver rules, and the scenario's own decisions are taken
//! by the suite's planning functions.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_expected_fail_cases_fail_with_their_reason
//! ```
//!
//! ## Test Categories
//!
//! - **Catalogue tests**: every case leads to the outcome its markers promise
//! - **Scenario tests**: snapshot limits, snapshot windows and restores
//! - **Decision tests**: how a dynamic run continues after each snapshot,
//!   how long it waits on one and which claim a restore asks for

#[path = "../common/mod.rs"]
mod common;

mod decision_tests;
mod mock_state;
mod scenario_tests;

pub use mock_state::*;
