//! Suite configuration.
//!
//! Two sources feed a run: command values (flags or `SCALE_*` environment
//! variables) and the driver data file describing the storage cluster the
//! driver under test is attached to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Values that select the cluster and shape the run.
#[derive(Args, Clone, Debug)]
pub struct CommandValues {
    /// Kubeconfig path; the inferred configuration is used when unset
    #[arg(long = "kubeconfig", env = "KUBECONFIG")]
    pub kubeconfig_value: Option<PathBuf>,

    /// Namespace the test objects are created in
    #[arg(long = "testnamespace", env = "SCALE_TEST_NAMESPACE", default_value = "ibm-test-namespace")]
    pub test_namespace: String,

    /// Run cases marked slow
    #[arg(long = "runslow", env = "SCALE_RUNSLOW")]
    pub runslow_val: bool,

    /// Driver data file (YAML)
    #[arg(long = "testconfig", env = "SCALE_TEST_CONFIG", default_value = "config/test.config")]
    pub test_config: PathBuf,
}

/// Storage cluster and driver details consumed by the cases.
#[derive(Clone, Debug, Deserialize)]
pub struct DriverData {
    /// Filesystem volumes are provisioned on.
    #[serde(rename = "primaryFs")]
    pub primary_fs: String,

    /// Overrides `primaryFs` when non-empty.
    #[serde(rename = "volBackendFs", default)]
    pub vol_backend_fs: String,

    /// Storage cluster id.
    pub id: String,

    #[serde(default = "default_id_number")]
    pub uid_number: String,

    #[serde(default = "default_id_number")]
    pub gid_number: String,

    #[serde(rename = "inodeLimit", default = "default_inode_limit")]
    pub inode_limit: String,

    #[serde(rename = "volDirBasePath", default = "default_vol_dir_base_path")]
    pub vol_dir_base_path: String,

    /// Storage pool used by the tiering cases.
    #[serde(default = "default_tier")]
    pub tier: String,

    /// Keep Kubernetes objects and filesets after each case.
    #[serde(default)]
    pub keepobjects: bool,

    /// Image of the test pods.
    #[serde(default = "default_image_name")]
    pub image_name: String,

    #[serde(rename = "pluginNodeSelector", default)]
    pub plugin_node_selector: BTreeMap<String, String>,

    /// Filesystem management endpoint.
    #[serde(rename = "guiHost")]
    pub gui_host: String,

    #[serde(rename = "guiPort", default = "default_gui_port")]
    pub gui_port: u16,

    pub username: String,

    pub password: String,

    /// Verify the management endpoint certificate.
    #[serde(rename = "secureSslMode", default)]
    pub secure_ssl_mode: bool,

    /// Node classes known to the storage cluster.
    #[serde(rename = "nodeClasses", default = "default_node_classes")]
    pub node_classes: Vec<String>,

    #[serde(rename = "operatorNamespace", default = "default_operator_namespace")]
    pub operator_namespace: String,

    #[serde(rename = "operatorDeployment", default = "default_operator_deployment")]
    pub operator_deployment: String,

    #[serde(rename = "driverDaemonSet", default = "default_driver_daemonset")]
    pub driver_daemonset: String,
}

fn default_id_number() -> String {
    "2000".to_string()
}

fn default_inode_limit() -> String {
    "1024".to_string()
}

fn default_vol_dir_base_path() -> String {
    "LW".to_string()
}

fn default_tier() -> String {
    "system".to_string()
}

fn default_image_name() -> String {
    "nginx:1.22.0".to_string()
}

fn default_gui_port() -> u16 {
    443
}

fn default_node_classes() -> Vec<String> {
    vec!["GUI_MGMT_SERVERS".to_string(), "GUI_SERVERS".to_string()]
}

fn default_operator_namespace() -> String {
    "ibm-spectrum-scale-csi-driver".to_string()
}

fn default_operator_deployment() -> String {
    "ibm-spectrum-scale-csi-operator".to_string()
}

fn default_driver_daemonset() -> String {
    "ibm-spectrum-scale-csi".to_string()
}

impl DriverData {
    /// Read and resolve the driver data file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read driver data {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let data: DriverData = serde_yaml::from_str(raw)?;
        data.resolve()
    }

    /// Apply the `volBackendFs` override and check required values.
    pub fn resolve(mut self) -> Result<Self> {
        if !self.vol_backend_fs.is_empty() {
            self.primary_fs = self.vol_backend_fs.clone();
        }
        if self.primary_fs.is_empty() {
            return Err(Error::Config("primaryFs must not be empty".to_string()));
        }
        if self.id.is_empty() {
            return Err(Error::Config("cluster id must not be empty".to_string()));
        }
        Ok(self)
    }

    /// Base URL of the filesystem management API.
    pub fn gui_url(&self) -> String {
        format!("https://{}:{}/scalemgmt/v2", self.gui_host, self.gui_port)
    }

    pub fn knows_node_class(&self, node_class: &str) -> bool {
        self.node_classes.iter().any(|n| n == node_class)
    }
}
