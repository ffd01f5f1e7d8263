//! Model version identifiers.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a version string does not parse as `MAJOR.MINOR`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid model version '{0}', expected MAJOR.MINOR")]
pub struct ParseVersionError(pub String);

/// A model version of the form `major.minor`.
///
/// Minor increments by one per training run; major never auto-increments.
/// Ordering is lexicographic on `(major, minor)`, so the maximum over all
/// persisted versions is the latest one. Serializes as the string `"1.2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
}

impl ModelVersion {
    /// First version ever assigned.
    pub const INITIAL: Self = Self { major: 1, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version the next training run receives.
    #[must_use]
    pub fn next_minor(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
        }
    }

    /// Stem used for artifact and metadata filenames, e.g. `model_v1_2`.
    pub fn file_stem(self) -> String {
        format!("model_v{}_{}", self.major, self.minor)
    }

    /// Parse a filename stem produced by [`Self::file_stem`].
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let rest = stem.strip_prefix("model_v")?;
        let (major, minor) = rest.split_once('_')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ModelVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| ParseVersionError(s.to_string()))?;
        let major = major
            .trim()
            .parse()
            .map_err(|_| ParseVersionError(s.to_string()))?;
        let minor = minor
            .trim()
            .parse()
            .map_err(|_| ParseVersionError(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
