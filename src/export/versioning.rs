//! Model file format versioning

use serde::{Deserialize, Serialize};

use crate::error::{RaksorError, Result};

/// Magic string identifying a ranking model file
pub const FORMAT_MAGIC: &str = "raksor-model";

/// Semantic version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ModelVersion {
    /// Version written by this build
    pub const CURRENT: ModelVersion = ModelVersion::new(1, 0, 0);

    /// Create new version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse from string (e.g., "1.2.3")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(RaksorError::ValidationError(format!(
                "Invalid version format: {}",
                s
            )));
        }

        let component = |name: &str, raw: &str| -> Result<u32> {
            raw.parse().map_err(|_| {
                RaksorError::ValidationError(format!("Invalid {} version: {}", name, raw))
            })
        };

        Ok(Self {
            major: component("major", parts[0])?,
            minor: component("minor", parts[1])?,
            patch: component("patch", parts[2])?,
        })
    }

    /// Whether a file written at `self` can be read by a build at `reader`.
    ///
    /// Majors must match; a newer minor may carry fields the reader does not
    /// know, so it is refused. Patch levels never matter.
    pub fn is_readable_by(&self, reader: &ModelVersion) -> bool {
        self.major == reader.major && self.minor <= reader.minor
    }
}

impl std::fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = ModelVersion::parse("1.2.3").unwrap();
        assert_eq!(v, ModelVersion::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
        assert!(ModelVersion::parse("1.2").is_err());
        assert!(ModelVersion::parse("one.2.3").is_err());
    }

    #[test]
    fn test_readability() {
        let reader = ModelVersion::new(1, 1, 0);
        assert!(ModelVersion::new(1, 0, 7).is_readable_by(&reader));
        assert!(ModelVersion::new(1, 1, 9).is_readable_by(&reader));
        assert!(!ModelVersion::new(1, 2, 0).is_readable_by(&reader));
        assert!(!ModelVersion::new(2, 0, 0).is_readable_by(&reader));
        assert!(!ModelVersion::new(0, 9, 0).is_readable_by(&reader));
    }
}
