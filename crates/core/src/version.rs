//! Application versions as compared by the build and upload gates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },

    #[error("too many version components in '{0}' (expected at most 3)")]
    TooManyComponents(String),
}

/// A `major.minor.build` triple.
///
/// Field order matters: the derived ordering is lexicographic on
/// (major, minor, build).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl Version {
    /// The version recorded before anything was ever built or uploaded.
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Returns the next build number, keeping major and minor.
    ///
    /// `None` when the build number is already `u32::MAX`.
    pub fn increment(self) -> Option<Self> {
        Some(Self {
            build: self.build.checked_add(1)?,
            ..self
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Accepts `M`, `M.m` and `M.m.b`; missing parts default to 0.
    /// An empty string is [`Version::ZERO`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Version::ZERO);
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in trimmed.split('.') {
            if count == parts.len() {
                return Err(VersionError::TooManyComponents(s.to_string()));
            }
            parts[count] = component
                .parse()
                .map_err(|_| VersionError::InvalidComponent {
                    input: s.to_string(),
                    component: component.to_string(),
                })?;
            count += 1;
        }

        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}
