//! Resource generation module.
//!
//! Pure functions building the Kubernetes objects each case creates.
//!
//! ## Resources Generated
//!
//! | Resource | Purpose |
//! |----------|---------|
//! | StorageClass | Driver parameters under test |
//! | PersistentVolumeClaim | Source, restored and cloned volumes |
//! | Pod | Writes and reads back the marker file |
//! | VolumeSnapshotClass | Deletion policy and snapshot window |
//! | VolumeSnapshot | Dynamic and pre-provisioned snapshots |
//! | VolumeSnapshotContent | Registration of filesystem snapshots |

pub mod common;
pub mod snapshot;
pub mod storage;
pub mod workload;

// Re-export commonly used items from common
pub use common::{standard_labels, unique_name};
