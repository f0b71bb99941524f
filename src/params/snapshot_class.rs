//! Volume snapshot class parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What happens to the snapshot content when the snapshot is deleted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Retain,
}

impl std::fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionPolicy::Delete => write!(f, "Delete"),
            DeletionPolicy::Retain => write!(f, "Retain"),
        }
    }
}

/// Snapshot class parameters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotClassParams {
    pub deletion_policy: DeletionPolicy,
    /// Consistency group snapshot window in minutes, kept as given.
    #[serde(default)]
    pub snap_window: Option<String>,
}

impl SnapshotClassParams {
    pub fn delete() -> Self {
        Self::default()
    }

    pub fn retain() -> Self {
        Self {
            deletion_policy: DeletionPolicy::Retain,
            snap_window: None,
        }
    }

    pub fn snap_window(mut self, minutes: impl Into<String>) -> Self {
        self.snap_window = Some(minutes.into());
        self
    }

    /// Driver parameters of the class.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(window) = &self.snap_window {
            params.insert("snapWindow".to_string(), window.clone());
        }
        params
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(window) = &self.snap_window
            && window.parse::<u32>().is_err()
        {
            return Err(Error::Validation(format!(
                "invalid snapWindow value: [{}]",
                window
            )));
        }
        Ok(())
    }
}
