//! Package versions
//!
//! NuGet-style four-part versions (`major.minor.build.revision`) with an
//! optional prerelease label. Missing numeric parts are zero, so `1.2` and
//! `1.2.0.0` are the same version.
//!
//! Ordering compares the numeric parts left to right. For equal numbers a
//! release sorts after any prerelease, and prerelease labels compare
//! lexicographically:
//!
//! ```
//! use nuvault_core::Version;
//!
//! let beta: Version = "1.2.0-beta".parse().unwrap();
//! let release: Version = "1.2.0".parse().unwrap();
//! assert!(beta < release);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// An immutable package version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    build: u32,
    revision: u32,
    prerelease: Option<String>,
}

impl Version {
    /// Create a release version from its numeric parts
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
            prerelease: None,
        }
    }

    /// Attach a prerelease label
    pub fn with_prerelease(mut self, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        validate_label(&label).map_err(|reason| CoreError::InvalidVersion {
            input: format!("{}-{}", self, label),
            reason,
        })?;
        self.prerelease = Some(label);
        Ok(self)
    }

    /// Parse `MAJOR[.MINOR[.BUILD[.REVISION]]][-LABEL]`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("version is empty"));
        }

        let (numbers, label) = match trimmed.split_once('-') {
            Some((numbers, label)) => (numbers, Some(label)),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() > 4 {
            return Err(invalid("at most four numeric components are allowed"));
        }

        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("numeric components must be non-negative integers"));
            }
            *slot = part
                .parse()
                .map_err(|_| invalid("numeric component is out of range"))?;
        }

        let prerelease = match label {
            Some(label) => {
                validate_label(label).map_err(|reason| invalid(&reason))?;
                Some(label.to_string())
            }
            None => None,
        };

        Ok(Self {
            major: components[0],
            minor: components[1],
            build: components[2],
            revision: components[3],
            prerelease,
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> u32 {
        self.build
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Prerelease label, if any
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn numbers(&self) -> (u32, u32, u32, u32) {
        (self.major, self.minor, self.build, self.revision)
    }
}

fn validate_label(label: &str) -> std::result::Result<(), String> {
    if label.is_empty() {
        return Err("prerelease label is empty".to_string());
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
    {
        return Err(format!("invalid character '{}' in prerelease label", c));
    }
    Ok(())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers()
            .cmp(&other.numbers())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(label) = &self.prerelease {
            write!(f, "-{}", label)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
