//! Volume and snapshot handles.

use crate::error::{Error, Result};

/// Storage class flavour encoded in handles.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum StorageClassType {
    #[default]
    Classic,
    /// Consistency-group storage class (`version: "2"`).
    Advanced,
}

impl StorageClassType {
    pub fn code(self) -> &'static str {
        match self {
            StorageClassType::Classic => "0",
            StorageClassType::Advanced => "1",
        }
    }

    fn from_code(code: &str) -> Result<Self> {
        match code {
            "0" => Ok(StorageClassType::Classic),
            "1" => Ok(StorageClassType::Advanced),
            other => Err(Error::Validation(format!(
                "unknown storage class type '{}'",
                other
            ))),
        }
    }
}

/// Kind of volume encoded in handles.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VolumeType {
    /// Light-weight volume: a directory under `volDirBasePath`.
    Directory,
    DependentFileset,
    IndependentFileset,
}

impl VolumeType {
    pub fn code(self) -> &'static str {
        match self {
            VolumeType::Directory => "0",
            VolumeType::DependentFileset => "1",
            VolumeType::IndependentFileset => "2",
        }
    }

    fn from_code(code: &str) -> Result<Self> {
        match code {
            "0" => Ok(VolumeType::Directory),
            "1" => Ok(VolumeType::DependentFileset),
            "2" => Ok(VolumeType::IndependentFileset),
            other => Err(Error::Validation(format!("unknown volume type '{}'", other))),
        }
    }

    pub fn is_fileset_based(self) -> bool {
        !matches!(self, VolumeType::Directory)
    }
}

/// Volume handle: `<sc_type>;<vol_type>;<cluster_id>;<fs_uuid>;<cg>;<fileset>;<path>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeId {
    pub storage_class_type: StorageClassType,
    pub volume_type: VolumeType,
    pub cluster_id: String,
    pub fs_uuid: String,
    pub consistency_group: String,
    /// Empty for directory based volumes.
    pub fileset_name: String,
    pub path: String,
}

impl VolumeId {
    pub fn parse(id: &str) -> Result<Self> {
        let fields: Vec<&str> = id.split(';').collect();
        let [sc_type, vol_type, cluster_id, fs_uuid, cg, fileset, path] = fields.as_slice() else {
            return Err(Error::Validation(format!(
                "invalid volume id [{}]: expected 7 fields, got {}",
                id,
                fields.len()
            )));
        };
        Ok(Self {
            storage_class_type: StorageClassType::from_code(sc_type)?,
            volume_type: VolumeType::from_code(vol_type)?,
            cluster_id: cluster_id.to_string(),
            fs_uuid: fs_uuid.to_string(),
            consistency_group: cg.to_string(),
            fileset_name: fileset.to_string(),
            path: path.to_string(),
        })
    }

    /// Fileset that holds the snapshots of this volume.
    ///
    /// Advanced volumes are snapshotted through their consistency group.
    pub fn snapshot_fileset(&self) -> &str {
        match self.storage_class_type {
            StorageClassType::Advanced => &self.consistency_group,
            StorageClassType::Classic => &self.fileset_name,
        }
    }
}

impl std::fmt::Display for VolumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{}",
            self.storage_class_type.code(),
            self.volume_type.code(),
            self.cluster_id,
            self.fs_uuid,
            self.consistency_group,
            self.fileset_name,
            self.path
        )
    }
}

/// Snapshot handle.
///
/// Dynamically created snapshots carry the long form
/// `sc_type;vol_type;cluster;fs_uuid;cg;fileset;snapshot;meta_snapshot;path`.
/// Pre-provisioned snapshots use the short form
/// `cluster;fs_uuid;fileset;snapshot;path`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotId {
    pub storage_class_type: StorageClassType,
    pub volume_type: Option<VolumeType>,
    pub cluster_id: String,
    pub fs_uuid: String,
    pub consistency_group: String,
    pub fileset_name: String,
    pub snapshot_name: String,
    pub meta_snapshot_name: String,
    pub path: String,
}

impl SnapshotId {
    /// Handle for a snapshot created directly on the filesystem.
    pub fn pre_provisioned(
        cluster_id: impl Into<String>,
        fs_uuid: impl Into<String>,
        fileset_name: impl Into<String>,
        snapshot_name: impl Into<String>,
    ) -> Self {
        Self {
            storage_class_type: StorageClassType::Classic,
            volume_type: None,
            cluster_id: cluster_id.into(),
            fs_uuid: fs_uuid.into(),
            consistency_group: String::new(),
            fileset_name: fileset_name.into(),
            snapshot_name: snapshot_name.into(),
            meta_snapshot_name: String::new(),
            path: "/".to_string(),
        }
    }

    /// Parse a snapshot handle.
    ///
    /// Eight or more fields are read as the long form and four to seven as
    /// the short form. The path is only taken from a handle of exactly nine
    /// or five fields; any other length means the root path.
    pub fn parse(id: &str) -> Result<Self> {
        let fields: Vec<&str> = id.split(';').collect();
        let path_at = |len: usize| match fields.get(len - 1) {
            Some(p) if fields.len() == len && !p.is_empty() => p.to_string(),
            _ => "/".to_string(),
        };

        match fields.as_slice() {
            [sc_type, vol_type, cluster, fs_uuid, cg, fileset, snap, meta, ..] => Ok(Self {
                storage_class_type: StorageClassType::from_code(sc_type)?,
                volume_type: Some(VolumeType::from_code(vol_type)?),
                cluster_id: cluster.to_string(),
                fs_uuid: fs_uuid.to_string(),
                consistency_group: cg.to_string(),
                fileset_name: fileset.to_string(),
                snapshot_name: snap.to_string(),
                meta_snapshot_name: meta.to_string(),
                path: path_at(9),
            }),
            [cluster, fs_uuid, fileset, snap, ..] => Ok(Self {
                path: path_at(5),
                ..Self::pre_provisioned(*cluster, *fs_uuid, *fileset, *snap)
            }),
            _ => Err(Error::Validation(format!("Invalid Snapshot Id : [{}]", id))),
        }
    }

    pub fn is_pre_provisioned(&self) -> bool {
        self.volume_type.is_none()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.volume_type {
            None => write!(
                f,
                "{};{};{};{};{}",
                self.cluster_id, self.fs_uuid, self.fileset_name, self.snapshot_name, self.path
            ),
            Some(volume_type) => write!(
                f,
                "{};{};{};{};{};{};{};{};{}",
                self.storage_class_type.code(),
                volume_type.code(),
                self.cluster_id,
                self.fs_uuid,
                self.consistency_group,
                self.fileset_name,
                self.snapshot_name,
                self.meta_snapshot_name,
                self.path
            ),
        }
    }
}
