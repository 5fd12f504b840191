// src/version/mod.rs

//! Version labels and version ranges for package recipes
//!
//! Recipe versions are a mix of numeric releases (`2.03.00`, `0.1.0-rc0`)
//! and named branches (`develop`, `master`, `gabriele`). Ordering follows
//! the usual scientific package manager conventions:
//!
//! - labels split into segments at `.`, `-`, `_` and digit/letter boundaries
//! - numeric segments compare numerically and rank above textual ones
//! - development branch names (`develop`, `main`, `master`, ...) rank above
//!   every numeric release
//!
//! Ranges are written `lo:hi` with either end optional. The upper bound is
//! inclusive of every version it is a prefix of, so `:2.0.99` admits
//! `2.0.99.1` and `3.7.0:3.7.99` admits `3.7.99.2`.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Branch names that sort above all numeric versions, lowest first
const INFINITY_VERSIONS: &[&str] = &["stable", "trunk", "head", "master", "main", "develop"];

/// One comparable piece of a version label
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Text(String),
}

impl Segment {
    fn infinity_rank(&self) -> Option<usize> {
        match self {
            Segment::Text(s) => INFINITY_VERSIONS.iter().position(|v| *v == s),
            Segment::Number(_) => None,
        }
    }

    fn compare(&self, other: &Segment) -> Ordering {
        match (self.infinity_rank(), other.infinity_rank()) {
            (Some(a), Some(b)) => return a.cmp(&b),
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => {}
        }

        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        }
    }
}

/// A version label as written in a recipe
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version label
    ///
    /// Examples:
    /// - "2.03.00" → [2, 3, 0]
    /// - "0.1.0-rc0" → [0, 1, 0, "rc", 0]
    /// - "develop" → ["develop"]
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::InvalidVersion {
                input: s.to_string(),
                reason: "empty version".to_string(),
            });
        }

        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(Error::InvalidVersion {
                input: s.to_string(),
                reason: format!("unexpected character '{}'", bad),
            });
        }

        let mut segments = Vec::new();
        for piece in raw.split(['.', '-', '_']) {
            if piece.is_empty() {
                continue;
            }
            Self::split_runs(piece, &mut segments);
        }

        if segments.is_empty() {
            return Err(Error::InvalidVersion {
                input: s.to_string(),
                reason: "no version segments".to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Split "0rc1" into [0, "rc", 1]
    fn split_runs(piece: &str, out: &mut Vec<Segment>) {
        let mut current = String::new();
        let mut numeric = None;

        for c in piece.chars() {
            let is_digit = c.is_ascii_digit();
            if numeric.is_some_and(|n| n != is_digit) {
                out.push(Self::segment(&current));
                current.clear();
            }
            numeric = Some(is_digit);
            current.push(c);
        }

        if !current.is_empty() {
            out.push(Self::segment(&current));
        }
    }

    fn segment(run: &str) -> Segment {
        // Overlong digit runs (commit-like labels) fall back to text
        match run.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Text(run.to_string()),
        }
    }

    /// The label exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether every segment is numeric (a release rather than a branch name)
    pub fn is_numeric(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Number(_)))
    }

    /// Whether this is a development branch name such as `develop` or `master`
    pub fn is_development(&self) -> bool {
        self.segments.first().is_some_and(|s| s.infinity_rank().is_some())
    }

    /// Check whether `self` is a segment prefix of `other` (`1.2` of `1.2.7`)
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a == b)
    }

    /// Compare two versions segment by segment
    pub fn compare(&self, other: &Version) -> Ordering {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match a.compare(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in &self.segments {
            match segment {
                Segment::Number(n) => n.hash(state),
                Segment::Text(t) => t.hash(state),
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A set of acceptable versions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionRange {
    /// `@v`: the version itself and anything it prefixes
    Exact(Version),
    /// `@lo:hi`, `@lo:`, `@:hi`; bounds are inclusive
    Between {
        lo: Option<Version>,
        hi: Option<Version>,
    },
}

impl VersionRange {
    /// Parse a single range element (no leading `@`, no commas)
    ///
    /// Examples:
    /// - "3.3" → Exact(3.3)
    /// - "2.5.00:2.7.00" → Between(2.5.00, 2.7.00)
    /// - ":2.0.99" → Between(None, 2.0.99)
    /// - "2.5.0:" → Between(2.5.0, None)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let Some((lo, hi)) = s.split_once(':') else {
            return Ok(VersionRange::Exact(Version::parse(s)?));
        };

        let lo = Self::bound(lo)?;
        let hi = Self::bound(hi)?;

        if let (Some(l), Some(h)) = (&lo, &hi) {
            if l > h && !h.is_prefix_of(l) {
                return Err(Error::InvalidVersion {
                    input: s.to_string(),
                    reason: format!("lower bound {} is above upper bound {}", l, h),
                });
            }
        }

        Ok(VersionRange::Between { lo, hi })
    }

    fn bound(s: &str) -> Result<Option<Version>> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            Version::parse(s).map(Some)
        }
    }

    /// A range admitting every version
    pub fn any() -> Self {
        VersionRange::Between { lo: None, hi: None }
    }

    /// Check if a version falls in this range
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => v.is_prefix_of(version),
            VersionRange::Between { lo, hi } => {
                let above = lo.as_ref().is_none_or(|l| version >= l);
                let below = hi
                    .as_ref()
                    .is_none_or(|h| version <= h || h.is_prefix_of(version));
                above && below
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Exact(v) => write!(f, "{}", v),
            VersionRange::Between { lo, hi } => {
                if let Some(lo) = lo {
                    write!(f, "{}", lo)?;
                }
                write!(f, ":")?;
                if let Some(hi) = hi {
                    write!(f, "{}", hi)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a comma-separated version list such as "gabriele,gitlab" or "1.0:1.9,2.1"
pub fn parse_version_list(s: &str) -> Result<Vec<VersionRange>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(VersionRange::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_parse_numeric() {
        let ver = v("2.03.00");
        assert!(ver.is_numeric());
        assert!(!ver.is_development());
        assert_eq!(ver.as_str(), "2.03.00");
        assert_eq!(ver, v("2.3.0"));
    }

    #[test]
    fn test_version_parse_named() {
        let ver = v("gabriele");
        assert!(!ver.is_numeric());
        assert!(!ver.is_development());
        assert!(v("develop").is_development());
        assert!(v("master").is_development());
    }

    #[test]
    fn test_version_parse_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("   ").is_err());
        assert!(Version::parse("1.0 beta").is_err());
        assert!(Version::parse("1.0@2").is_err());
        assert!(Version::parse("...").is_err());
    }

    #[test]
    fn test_version_compare_numeric() {
        assert!(v("2.9.00") < v("3.1.00"));
        assert!(v("2.04.11") > v("2.04.04"));
        assert!(v("2.7.24") > v("2.7.00"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn test_version_compare_prerelease_below_release_segment() {
        // "rc" is textual and ranks below the numeric segment it competes with
        assert!(v("0.1.0-rc0") > v("0.1.0"));
        assert!(v("0.1.0-rc0") < v("0.1.0.1"));
    }

    #[test]
    fn test_version_compare_development_branches() {
        assert!(v("develop") > v("99.99"));
        assert!(v("master") > v("3.1.00"));
        assert!(v("develop") > v("master"));
        // Ordinary names rank below numbers
        assert!(v("gabriele") < v("0.1"));
    }

    #[test]
    fn test_version_prefix() {
        assert!(v("1.8").is_prefix_of(&v("1.8.19")));
        assert!(v("1.8").is_prefix_of(&v("1.8")));
        assert!(!v("1.8.19").is_prefix_of(&v("1.8")));
        assert!(!v("1.8").is_prefix_of(&v("1.9.0")));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(v("2.03.00").to_string(), "2.03.00");
        assert_eq!(v("0.1.0-rc0").to_string(), "0.1.0-rc0");
    }

    #[test]
    fn test_range_exact_matches_prefix() {
        let r = VersionRange::parse("3.3").unwrap();
        assert!(r.contains(&v("3.3")));
        assert!(r.contains(&v("3.3.8")));
        assert!(!r.contains(&v("3.4")));
    }

    #[test]
    fn test_range_upper_bound_only() {
        let r = VersionRange::parse(":2.0.99").unwrap();
        assert!(r.contains(&v("2.0.0")));
        assert!(r.contains(&v("2.0.99")));
        assert!(r.contains(&v("2.0.99.4")));
        assert!(!r.contains(&v("2.1.0")));
    }

    #[test]
    fn test_range_lower_bound_only() {
        let r = VersionRange::parse("2.5.0:").unwrap();
        assert!(r.contains(&v("2.5.0")));
        assert!(r.contains(&v("2.6.1")));
        assert!(r.contains(&v("develop")));
        assert!(!r.contains(&v("2.4.99")));
    }

    #[test]
    fn test_range_closed() {
        let r = VersionRange::parse("2.5.00:2.7.00").unwrap();
        assert!(r.contains(&v("2.5.00")));
        assert!(r.contains(&v("2.7.00")));
        assert!(r.contains(&v("2.6.3")));
        assert!(!r.contains(&v("2.7.24")));
        assert!(!r.contains(&v("2.04.11")));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(VersionRange::parse("3.0:2.0").is_err());
        // A bound that prefixes the lower bound is still a valid range
        assert!(VersionRange::parse("3.7.1:3.7").is_ok());
    }

    #[test]
    fn test_range_display() {
        assert_eq!(VersionRange::parse("3.3.3:3.3.99").unwrap().to_string(), "3.3.3:3.3.99");
        assert_eq!(VersionRange::parse(":1.8.19").unwrap().to_string(), ":1.8.19");
        assert_eq!(VersionRange::parse("2.4.0:").unwrap().to_string(), "2.4.0:");
        assert_eq!(VersionRange::any().to_string(), ":");
    }

    #[test]
    fn test_parse_version_list() {
        let list = parse_version_list("gabriele,gitlab,suchyta").unwrap();
        assert_eq!(list.len(), 3);
        assert!(list[1].contains(&v("gitlab")));
        assert!(parse_version_list("1.0,:").unwrap()[1].contains(&v("0.1")));
    }
}
