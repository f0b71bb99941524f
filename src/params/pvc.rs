//! Persistent volume claim parameters.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Claim access mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AccessMode {
    #[default]
    ReadWriteMany,
    ReadWriteOnce,
    ReadOnlyMany,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadWriteMany => write!(f, "ReadWriteMany"),
            AccessMode::ReadWriteOnce => write!(f, "ReadWriteOnce"),
            AccessMode::ReadOnlyMany => write!(f, "ReadOnlyMany"),
        }
    }
}

/// Claim parameters, including the expansion sequences of resize scenarios.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PvcParams {
    pub access_modes: AccessMode,
    pub storage: String,
    /// Expected failure; the claim must report an event containing this text.
    #[serde(default)]
    pub reason: Option<String>,
    /// Sizes the source claim is expanded to before snapshots are taken.
    #[serde(default)]
    pub presnap_volume_expansion_storage: Vec<String>,
    /// Sizes a restored claim is expanded to after it binds.
    #[serde(default)]
    pub post_presnap_volume_expansion_storage: Vec<String>,
    /// Sizes the source claim is expanded to after snapshots are taken.
    #[serde(default)]
    pub postsnap_volume_expansion_storage: Vec<String>,
}

impl PvcParams {
    pub fn new(access_modes: AccessMode, storage: impl Into<String>) -> Self {
        Self {
            access_modes,
            storage: storage.into(),
            reason: None,
            presnap_volume_expansion_storage: Vec::new(),
            post_presnap_volume_expansion_storage: Vec::new(),
            postsnap_volume_expansion_storage: Vec::new(),
        }
    }

    /// The 1Gi ReadWriteMany claim most cases use.
    pub fn rwx_1gi() -> Self {
        Self::new(AccessMode::ReadWriteMany, "1Gi")
    }

    /// The 1Gi ReadWriteOnce claim.
    pub fn rwo_1gi() -> Self {
        Self::new(AccessMode::ReadWriteOnce, "1Gi")
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn presnap_expansion<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presnap_volume_expansion_storage = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn post_presnap_expansion<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_presnap_volume_expansion_storage = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn postsnap_expansion<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.postsnap_volume_expansion_storage = sizes.into_iter().map(Into::into).collect();
        self
    }

    /// Requested size in bytes.
    pub fn storage_bytes(&self) -> Result<u64> {
        parse_quantity(&self.storage)
    }

    /// Size of the source claim once every pre-snapshot expansion is applied.
    pub fn size_at_snapshot(&self) -> &str {
        self.presnap_volume_expansion_storage
            .last()
            .map(String::as_str)
            .unwrap_or(&self.storage)
    }

    /// Check sizes parse and that no expansion sequence shrinks a claim.
    pub fn validate(&self) -> Result<()> {
        let base = self.storage_bytes()?;
        let snapshot_size = check_growing(base, &self.presnap_volume_expansion_storage)?;
        check_growing(snapshot_size, &self.post_presnap_volume_expansion_storage)?;
        check_growing(snapshot_size, &self.postsnap_volume_expansion_storage)?;
        Ok(())
    }

    /// Whether any expansion is requested, which needs `allowVolumeExpansion`.
    pub fn expands(&self) -> bool {
        !(self.presnap_volume_expansion_storage.is_empty()
            && self.post_presnap_volume_expansion_storage.is_empty()
            && self.postsnap_volume_expansion_storage.is_empty())
    }
}

fn check_growing(start: u64, sizes: &[String]) -> Result<u64> {
    let mut current = start;
    for size in sizes {
        let next = parse_quantity(size)?;
        if next < current {
            return Err(Error::Validation(format!(
                "volume expansion to {} would shrink the claim",
                size
            )));
        }
        current = next;
    }
    Ok(current)
}

/// Parse a Kubernetes binary quantity such as `1Gi` into bytes.
pub fn parse_quantity(quantity: &str) -> Result<u64> {
    // Pattern: ^([0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei)?$
    static QUANTITY_RE: LazyLock<Option<Regex>> =
        LazyLock::new(|| Regex::new(r"^([0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei)?$").ok());

    let invalid = || {
        Error::Validation(format!(
            "invalid storage size '{}'. Expected format: <number><unit> where unit is Ki, Mi, Gi, Ti, Pi or Ei",
            quantity
        ))
    };

    let caps = QUANTITY_RE
        .as_ref()
        .and_then(|re| re.captures(quantity))
        .ok_or_else(invalid)?;
    let value: u64 = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(invalid)?;
    let shift = match caps.get(2).map(|m| m.as_str()) {
        None => 0,
        Some("Ki") => 10,
        Some("Mi") => 20,
        Some("Gi") => 30,
        Some("Ti") => 40,
        Some("Pi") => 50,
        Some(_) => 60,
    };
    value.checked_mul(1u64 << shift).ok_or_else(invalid)
}
