//! Model of the CSI driver's snapshot rules.
//!
//! The suite never re-implements the driver, but it needs the driver's
//! identifiers to register pre-provisioned snapshots and its rules to know
//! which requests must fail and with what message.
//!
//! | Item | Purpose |
//! |------|---------|
//! | `VolumeId` | Volume handle of provisioned volumes |
//! | `SnapshotId` | Snapshot handle, including the static form |
//! | `ScaleVersion` | Minimum version checks for snapshot features |
//! | `rules` | Snapshot eligibility, limits and windows |

mod ids;
pub mod rules;
mod version;

pub use ids::{SnapshotId, StorageClassType, VolumeId, VolumeType};
pub use rules::{
    DEFAULT_SNAP_WINDOW_MINUTES, MAX_SNAPSHOTS_PER_FILESET, SUPPORTED_SC_PARAMETERS,
};
pub use version::{Feature, ScaleVersion};

/// Name under which the driver registers with Kubernetes.
pub const DRIVER_NAME: &str = "spectrumscale.csi.ibm.com";
