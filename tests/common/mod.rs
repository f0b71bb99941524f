//! Shared test helpers.

#![allow(dead_code)]


pub use fixtures::DriverDataBuilder;
