//! Filesystem version parsing and feature gates.

use crate::error::{Error, Result};

/// Filesystem release, e.g. `5.1.5-0` or `5.1.5.0-developer build`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ScaleVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub fix: u32,
}

impl ScaleVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, fix: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            fix,
        }
    }

    pub fn parse(version: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("invalid Spectrum Scale version - {}", version));
        let number = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());

        let (release, build) = version.trim().split_once('-').unwrap_or((version.trim(), ""));
        let parts: Vec<&str> = release.split('.').collect();
        match parts.as_slice() {
            // Developer build: "5.1.5.0-developer build"
            [major, minor, patch, fix] => {
                Ok(Self::new(number(major)?, number(minor)?, number(patch)?, number(fix)?))
            }
            // GA build: "5.1.5-0" or "5.1.5-0_170818.165000"
            [major, minor, patch] => {
                let fix = build.get(..1).ok_or_else(invalid)?;
                Ok(Self::new(number(major)?, number(minor)?, number(patch)?, number(fix)?))
            }
            _ => Err(invalid()),
        }
    }

    pub fn supports(self, feature: Feature) -> bool {
        self >= feature.minimum()
    }
}

impl std::fmt::Display for ScaleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, self.fix)
    }
}

/// Driver features gated on the filesystem release.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Feature {
    Snapshot,
    VolumeClone,
    ConsistencyGroup,
}

impl Feature {
    pub fn minimum(self) -> ScaleVersion {
        match self {
            Feature::Snapshot => ScaleVersion::new(5, 1, 1, 0),
            Feature::VolumeClone => ScaleVersion::new(5, 1, 2, 1),
            Feature::ConsistencyGroup => ScaleVersion::new(5, 1, 3, 0),
        }
    }

    /// Message the driver returns when the release is too old.
    pub fn unsupported_message(self) -> String {
        let what = match self {
            Feature::Snapshot => "snapshot support",
            Feature::VolumeClone => "volume cloning support",
            Feature::ConsistencyGroup => "consistency group support",
        };
        format!(
            "the minimum required Spectrum Scale version for {} with CSI is {}",
            what,
            self.minimum()
        )
    }
}
