// lpad-common/src/version.rs
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LpadError;

/// Release identifier of the payload: `major.minor.patch`.
///
/// Ordering is lexicographic over the three fields, so `2.0.0` is newer than
/// `1.9.9` regardless of how large the lower fields are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lenient parse used for version files and remote documents.
    ///
    /// Anything other than exactly three dot-separated integers yields
    /// [`Version::ZERO`]. Callers that must tell "missing" from "malformed"
    /// apart check for the file separately or use [`Version::try_parse`].
    pub fn parse(text: &str) -> Self {
        Self::try_parse(text).unwrap_or(Self::ZERO)
    }

    /// Strict parse: `None` unless the text is exactly three integer components.
    pub fn try_parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let patch = parts[2].parse().ok()?;
        Some(Self::new(major, minor, patch))
    }

    /// True iff `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.cmp(other) == Ordering::Greater
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.patch.cmp(&other.patch))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = LpadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Version::try_parse(s).ok_or_else(|| {
            LpadError::Generic(format!(
                "'{}' is not a major.minor.patch version",
                s.trim()
            ))
        })
    }
}

// Manual Serialize/Deserialize to keep the canonical string form on the wire
impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse_is_identity() {
        for v in [
            Version::new(0, 0, 0),
            Version::new(1, 2, 3),
            Version::new(10, 0, 255),
            Version::new(40_000, 7, 1),
        ] {
            assert_eq!(Version::parse(&v.to_string()), v);
        }
    }

    #[test]
    fn wrong_component_count_is_zero() {
        assert_eq!(Version::parse("1.1"), Version::ZERO);
        assert_eq!(Version::parse("1.2.3.4"), Version::ZERO);
        assert_eq!(Version::parse(""), Version::ZERO);
        assert_eq!(Version::parse("7"), Version::ZERO);
    }

    #[test]
    fn non_numeric_components_are_zero() {
        assert_eq!(Version::parse("1.x.3"), Version::ZERO);
        assert_eq!(Version::parse("-1.0.0"), Version::ZERO);
        assert!(Version::try_parse("1..3").is_none());
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        assert_eq!(Version::parse("1.4.2\r\n"), Version::new(1, 4, 2));
    }

    #[test]
    fn not_newer_than_self() {
        let v = Version::new(3, 1, 4);
        assert!(!v.is_newer_than(&v));
        assert!(!Version::ZERO.is_newer_than(&Version::ZERO));
    }

    #[test]
    fn major_dominates_minor_and_patch() {
        let a = Version::new(2, 0, 0);
        let b = Version::new(1, 9, 9);
        assert!(a.is_newer_than(&b));
        assert!(!b.is_newer_than(&a));
        assert!(Version::new(1, 2, 0).is_newer_than(&Version::new(1, 1, 99)));
        assert!(Version::new(1, 1, 2).is_newer_than(&Version::new(1, 1, 1)));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let v = Version::new(1, 0, 7);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.0.7\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<Version>("\"1.0\"").is_err());
    }
}
