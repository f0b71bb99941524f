//! Storage class parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::driver::{SUPPORTED_SC_PARAMETERS, StorageClassType, VolumeType};
use crate::error::{Error, Result};

/// Fileset type requested for fileset based volumes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesetType {
    #[default]
    Independent,
    Dependent,
}

impl std::fmt::Display for FilesetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilesetType::Independent => write!(f, "independent"),
            FilesetType::Dependent => write!(f, "dependent"),
        }
    }
}

impl std::str::FromStr for FilesetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "independent" => Ok(FilesetType::Independent),
            "dependent" => Ok(FilesetType::Dependent),
            other => Err(Error::Validation(format!(
                "invalid filesetType '{}', expected independent or dependent",
                other
            ))),
        }
    }
}

/// Consistency group of an advanced storage class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsistencyGroup {
    /// Key present without a value; the suite derives a name from the namespace.
    Auto,
    /// Explicit consistency group name.
    Named(String),
}

/// Storage class parameters handed to the driver.
///
/// Every field is optional. Defaults are owned by the driver, so an unset
/// field is simply left out of the rendered parameter map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorageClassParams {
    pub vol_backend_fs: Option<String>,
    pub cluster_id: Option<String>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub inode_limit: Option<String>,
    pub fileset_type: Option<FilesetType>,
    pub parent_fileset: Option<String>,
    pub vol_dir_base_path: Option<String>,
    pub permissions: Option<String>,
    pub node_class: Option<String>,
    pub version: Option<String>,
    pub tier: Option<String>,
    pub compression: Option<String>,
    pub consistency_group: Option<ConsistencyGroup>,
    pub shared: Option<String>,
    pub allow_volume_expansion: bool,
}

impl StorageClassParams {
    /// Start from the backend filesystem, the one key nearly every case sets.
    pub fn on_filesystem(fs: impl Into<String>) -> Self {
        Self {
            vol_backend_fs: Some(fs.into()),
            ..Default::default()
        }
    }

    pub fn cluster_id(mut self, id: impl Into<String>) -> Self {
        self.cluster_id = Some(id.into());
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn gid(mut self, gid: impl Into<String>) -> Self {
        self.gid = Some(gid.into());
        self
    }

    pub fn inode_limit(mut self, limit: impl Into<String>) -> Self {
        self.inode_limit = Some(limit.into());
        self
    }

    pub fn fileset_type(mut self, fileset_type: FilesetType) -> Self {
        self.fileset_type = Some(fileset_type);
        self
    }

    pub fn vol_dir_base_path(mut self, path: impl Into<String>) -> Self {
        self.vol_dir_base_path = Some(path.into());
        self
    }

    pub fn permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    pub fn node_class(mut self, node_class: impl Into<String>) -> Self {
        self.node_class = Some(node_class.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    pub fn consistency_group(mut self, group: ConsistencyGroup) -> Self {
        self.consistency_group = Some(group);
        self
    }

    pub fn allow_volume_expansion(mut self, allow: bool) -> Self {
        self.allow_volume_expansion = allow;
        self
    }

    /// Storage class flavour the driver derives from `version`.
    pub fn storage_class_type(&self) -> StorageClassType {
        match self.version.as_deref() {
            Some("2") => StorageClassType::Advanced,
            _ => StorageClassType::Classic,
        }
    }

    /// Kind of volume the driver provisions for these parameters.
    pub fn volume_type(&self) -> VolumeType {
        if self.storage_class_type() == StorageClassType::Advanced {
            return VolumeType::DependentFileset;
        }
        if self.vol_dir_base_path.is_some() {
            return VolumeType::Directory;
        }
        match self.fileset_type.unwrap_or_default() {
            FilesetType::Independent => VolumeType::IndependentFileset,
            FilesetType::Dependent => VolumeType::DependentFileset,
        }
    }

    /// Render the driver parameter map without a namespace.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters_for(None)
    }

    /// Render the driver parameter map.
    ///
    /// An automatic consistency group is named `<namespace>-cg`; without a
    /// namespace it is left for the driver to default.
    pub fn parameters_for(&self, namespace: Option<&str>) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                params.insert(key.to_string(), v.clone());
            }
        };
        put("volBackendFs", &self.vol_backend_fs);
        put("clusterId", &self.cluster_id);
        put("uid", &self.uid);
        put("gid", &self.gid);
        put("inodeLimit", &self.inode_limit);
        put("parentFileset", &self.parent_fileset);
        put("volDirBasePath", &self.vol_dir_base_path);
        put("permissions", &self.permissions);
        put("nodeClass", &self.node_class);
        put("version", &self.version);
        put("tier", &self.tier);
        put("compression", &self.compression);
        put("shared", &self.shared);

        if let Some(fileset_type) = self.fileset_type {
            params.insert("filesetType".to_string(), fileset_type.to_string());
        }
        match (&self.consistency_group, namespace) {
            (Some(ConsistencyGroup::Named(name)), _) => {
                params.insert("consistencyGroup".to_string(), name.clone());
            }
            (Some(ConsistencyGroup::Auto), Some(ns)) => {
                params.insert("consistencyGroup".to_string(), format!("{}-cg", ns));
            }
            _ => {}
        }
        params
    }

    /// Build parameters from a raw map, rejecting keys the driver does not know.
    pub fn from_parameters(map: &BTreeMap<String, String>) -> Result<Self> {
        let invalid: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|k| !SUPPORTED_SC_PARAMETERS.contains(k))
            .collect();
        if !invalid.is_empty() {
            return Err(Error::Validation(format!(
                "The Parameter(s) not supported in storageClass: {}",
                invalid.join(", ")
            )));
        }

        let get = |key: &str| map.get(key).cloned();
        Ok(Self {
            vol_backend_fs: get("volBackendFs"),
            cluster_id: get("clusterId"),
            uid: get("uid"),
            gid: get("gid"),
            inode_limit: get("inodeLimit"),
            fileset_type: get("filesetType").map(|t| t.parse()).transpose()?,
            parent_fileset: get("parentFileset"),
            vol_dir_base_path: get("volDirBasePath"),
            permissions: get("permissions"),
            node_class: get("nodeClass"),
            version: get("version"),
            tier: get("tier"),
            compression: get("compression"),
            consistency_group: get("consistencyGroup").map(|name| {
                if name.is_empty() {
                    ConsistencyGroup::Auto
                } else {
                    ConsistencyGroup::Named(name)
                }
            }),
            shared: get("shared"),
            allow_volume_expansion: false,
        })
    }

    /// Check combinations the driver would reject at provisioning time.
    pub fn validate(&self) -> Result<()> {
        if self.vol_backend_fs.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Validation("volBackendFs must be set".to_string()));
        }
        if let Some(version) = self.version.as_deref()
            && version != "1"
            && version != "2"
        {
            return Err(Error::Validation(format!(
                "invalid version '{}', expected 1 or 2",
                version
            )));
        }
        if self.storage_class_type() == StorageClassType::Classic
            && self.consistency_group.is_some()
        {
            return Err(Error::Validation(
                "consistencyGroup is only supported with version 2".to_string(),
            ));
        }
        if self.vol_dir_base_path.is_some() && self.fileset_type.is_some() {
            return Err(Error::Validation(
                "volDirBasePath and filesetType are mutually exclusive".to_string(),
            ));
        }
        if let Some(permissions) = self.permissions.as_deref()
            && !(permissions.len() == 3 && permissions.chars().all(|c| ('0'..='7').contains(&c)))
        {
            return Err(Error::Validation(format!(
                "invalid permissions '{}', expected three octal digits",
                permissions
            )));
        }
        Ok(())
    }
}
