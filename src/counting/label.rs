//! Newtypes for track identities and class labels.
//!
//! Identities come from an external multi-object tracker and are opaque to
//! the counter; class labels come from the detector and are normalized once
//! on the way in so that `Car`, ` car ` and `car` land in the same bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An identity assigned by the external tracker.
///
/// Stable for as long as the tracker keeps association for one physical
/// object. The counter never interprets the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl TrackId {
    /// Creates a new TrackId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackId({})", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized vehicle class label such as `car` or `motorcycle`.
///
/// Construction always normalizes: surrounding whitespace is trimmed, the
/// label is lowercased, and known aliases are folded into their canonical
/// name (`motorbike` becomes `motorcycle`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

/// Detector names that count as another class.
const ALIASES: &[(&str, &str)] = &[("motorbike", "motorcycle")];

impl ClassLabel {
    /// Creates a normalized class label.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lowered = raw.as_ref().trim().to_lowercase();
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or(lowered);
        Self(canonical)
    }

    /// Returns the label as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the label is empty after normalization.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ClassLabel::new(raw))
    }
}

impl From<&str> for ClassLabel {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ClassLabel {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Debug for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassLabel({:?})", self.0)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
