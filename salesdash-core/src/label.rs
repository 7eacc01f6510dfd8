//! Provenance tags for cache entries and cache instances.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Names a cache instance, or marks which fetch wrote an entry.
///
/// Tags are never part of a lookup. Dotted composition records a chain of
/// provenance, e.g. an entry written by a background refresh of the current
/// totals is tagged `current_totals.revalidated`.
///
/// ```
/// use salesdash_core::CacheTag;
///
/// let tag = CacheTag::new("current_totals").compose(&CacheTag::new("revalidated"));
/// assert_eq!(tag.as_str(), "current_totals.revalidated");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTag(SmolStr);

impl CacheTag {
    /// Tag from any string.
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self(tag.into())
    }

    /// Tag from a static string, usable in constants.
    pub const fn new_static(tag: &'static str) -> Self {
        Self(SmolStr::new_static(tag))
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `self.other`.
    pub fn compose(&self, other: &CacheTag) -> Self {
        Self(SmolStr::from(format!("{}.{}", self.0, other.0)))
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for CacheTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl AsRef<str> for CacheTag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tag_in_const() {
        const MONTHLY: CacheTag = CacheTag::new_static("monthly");
        assert_eq!(MONTHLY.to_string(), "monthly");
    }

    #[test]
    fn test_compose_chain() {
        let tag = CacheTag::from("breakdown")
            .compose(&"revalidated".into())
            .compose(&"retry".into());
        assert_eq!(tag.as_str(), "breakdown.revalidated.retry");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let tag = CacheTag::new("weekly");
        assert_eq!(serde_json::to_string(&tag).unwrap(), r#""weekly""#);
    }
}
