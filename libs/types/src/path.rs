//! Asset-data path grammar (spec §3, §6).
//!
//! `/<seg>(/<seg>)*` where each `<seg>` is non-empty and contains no `/`. The
//! first segment may not collide with the reserved standard LWM2M object
//! paths, since those are served by the built-in object model rather than
//! this flat asset-data namespace.

use crate::error::ConnError;
use std::fmt;

/// First path segments reserved for standard LWM2M objects (spec §3).
pub const RESERVED_FIRST_SEGMENTS: &[&str] = &[
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10241", "10242", "10243",
];

/// A validated `"/seg/seg/..."` asset-data path.
///
/// Stored as the original string plus a cached list of segment boundaries so
/// prefix/ancestor checks (used constantly by the registry's subtree
/// enumeration) don't re-split the string on every comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetDataPath {
    raw: String,
}

impl AssetDataPath {
    /// Parse and validate a path string per the grammar in spec §6.
    pub fn parse(s: &str) -> Result<Self, ConnError> {
        if !s.starts_with('/') {
            return Err(ConnError::fault(format!(
                "asset-data path must start with '/': {s:?}"
            )));
        }
        if s.len() > 1 && s.ends_with('/') {
            return Err(ConnError::fault(format!(
                "asset-data path must not end with '/': {s:?}"
            )));
        }
        let segments: Vec<&str> = s[1..].split('/').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(ConnError::fault(format!(
                "asset-data path contains an empty segment: {s:?}"
            )));
        }
        if let Some(first) = segments.first() {
            if RESERVED_FIRST_SEGMENTS.contains(first) {
                return Err(ConnError::fault(format!(
                    "asset-data path's first segment {first:?} is reserved for standard LWM2M objects"
                )));
            }
        }
        Ok(Self { raw: s.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw[1..].split('/')
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `self` is a proper ancestor of `other` at a segment boundary:
    /// `self` is a strict prefix of `other` and the next byte in `other` is
    /// a `/`. Used both for the path-uniqueness invariant and for subtree
    /// enumeration.
    pub fn is_proper_ancestor_of(&self, other: &AssetDataPath) -> bool {
        let a = self.as_str();
        let b = other.as_str();
        b.len() > a.len() && b.starts_with(a) && b.as_bytes()[a.len()] == b'/'
    }

    /// True if `self` and `other` collide under the path-uniqueness
    /// invariant of spec §3: equal, or either a proper ancestor of the
    /// other.
    pub fn collides_with(&self, other: &AssetDataPath) -> bool {
        self == other || self.is_proper_ancestor_of(other) || other.is_proper_ancestor_of(self)
    }

    /// Segment at `self`'s depth within `descendant`, i.e. the next path
    /// component after `self`'s prefix. Used by the CBOR encoder to build
    /// map keys for a subtree read.
    pub fn next_segment_of<'a>(&self, descendant: &'a AssetDataPath) -> Option<&'a str> {
        if !self.is_proper_ancestor_of(descendant) {
            return None;
        }
        descendant.as_str()[self.as_str().len() + 1..]
            .split('/')
            .next()
    }

    /// Build the child path `self/child_segment`.
    pub fn child(&self, segment: &str) -> Result<AssetDataPath, ConnError> {
        AssetDataPath::parse(&format!("{}/{}", self.raw, segment))
    }
}

impl fmt::Display for AssetDataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for AssetDataPath {
    type Err = ConnError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetDataPath::parse(s)
    }
}
