//! Case parameters.
//!
//! Transient configuration values each case builds and hands to the suite:
//! storage class, claim, snapshot class and pod mount parameters.

mod pod;
mod pvc;
mod snapshot_class;
mod storage_class;

pub use pod::PodParams;
pub use pvc::{AccessMode, PvcParams, parse_quantity};
pub use snapshot_class::{DeletionPolicy, SnapshotClassParams};
pub use storage_class::{ConsistencyGroup, FilesetType, StorageClassParams};
