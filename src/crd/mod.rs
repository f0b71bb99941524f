//! Custom resource types used by the suite.
//!
//! - `VolumeSnapshot`, `VolumeSnapshotContent`, `VolumeSnapshotClass`: the
//!   external snapshotter API (`snapshot.storage.k8s.io/v1`)

mod volume_snapshot;

pub use volume_snapshot::*;
