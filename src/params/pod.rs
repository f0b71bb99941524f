//! Pod mount parameters.

use serde::{Deserialize, Serialize};

/// How a test pod mounts its claim.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PodParams {
    pub mount_path: String,
    pub read_only: bool,
    /// Sub-paths mounted in addition to the volume root.
    #[serde(default)]
    pub sub_path: Vec<String>,
    /// Read-only flag per sub-path mount; missing entries mean writable.
    #[serde(default)]
    pub volumemount_readonly: Vec<bool>,
}

impl Default for PodParams {
    fn default() -> Self {
        Self {
            mount_path: "/usr/share/nginx/html/scale".to_string(),
            read_only: false,
            sub_path: Vec::new(),
            volumemount_readonly: Vec::new(),
        }
    }
}

impl PodParams {
    pub fn sub_path(mut self, path: impl Into<String>, read_only: bool) -> Self {
        self.sub_path.push(path.into());
        self.volumemount_readonly.push(read_only);
        self
    }

    /// Read-only flag of the sub-path mount at `index`.
    pub fn sub_path_read_only(&self, index: usize) -> bool {
        self.volumemount_readonly
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    /// Mount path of the sub-path mount at `index`.
    pub fn sub_path_mount(&self, index: usize) -> String {
        format!("{}-sub{}", self.mount_path.trim_end_matches('/'), index)
    }
}
