//! Cache key types and construction.
//!
//! - [`CacheKey`] - A cache key with prefix and sorted parts
//! - [`KeyPart`] - A single key-value component of a cache key
//! - [`generate_key`] - Shortcut returning the rendered key string
//!
//! ## Format
//!
//! Keys render as `{prefix}:key1=value1&key2=value2`. Parts are always sorted
//! by key name, so two logically identical requests produce the same key no
//! matter in which order their parameters were supplied.
//!
//! ```
//! use salesdash_core::{CacheKey, generate_key};
//!
//! let a = generate_key("p", [("b", "2"), ("a", "1")]);
//! let b = generate_key("p", [("a", "1"), ("b", "2")]);
//! assert_eq!(a, b);
//! assert_eq!(a, "p:a=1&b=2");
//!
//! // Empty params keep the separator
//! let empty = CacheKey::new("sales", Vec::<(&str, &str)>::new());
//! assert_eq!(empty.as_str(), "sales:");
//! ```
//!
//! ## Escaping
//!
//! The separator characters `&`, `=` and `%` are percent-encoded inside key
//! names and values, so distinct `(prefix, params)` pairs never render to the
//! same string.

use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Eq, PartialEq)]
struct CacheKeyInner {
    prefix: SmolStr,
    parts: Vec<KeyPart>,
    rendered: String,
}

/// A cache key identifying one logical request.
///
/// `CacheKey` wraps its data in [`Arc`], so `clone()` only bumps a reference
/// count. Equality and hashing use the rendered string.
#[derive(Clone, Debug)]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.rendered == other.inner.rendered
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.rendered.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.rendered)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.inner.rendered
    }
}

impl CacheKey {
    /// Creates a cache key from a prefix and an unordered set of parameters.
    ///
    /// Parameters are sorted by name (then by value, for repeated names)
    /// before rendering.
    pub fn new<I, K, V>(prefix: impl Into<SmolStr>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.into();
        let mut parts: Vec<KeyPart> = params
            .into_iter()
            .map(|(key, value)| KeyPart::new(key, value))
            .collect();
        parts.sort();
        let rendered = render(&prefix, &parts);
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                prefix,
                parts,
                rendered,
            }),
        }
    }

    /// Returns the cache key prefix.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Returns an iterator over the sorted key parts.
    pub fn parts(&self) -> impl Iterator<Item = &KeyPart> {
        self.inner.parts.iter()
    }

    /// Returns the rendered key.
    pub fn as_str(&self) -> &str {
        &self.inner.rendered
    }
}

/// Renders `prefix:key=value&...` for the given parameters.
pub fn generate_key<I, K, V>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    CacheKey::new(prefix, params).as_str().to_owned()
}

fn render(prefix: &str, parts: &[KeyPart]) -> String {
    let mut out = String::with_capacity(prefix.len() + 1 + parts.len() * 16);
    out.push_str(prefix);
    out.push(':');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        escape_into(&mut out, &part.key);
        out.push('=');
        escape_into(&mut out, &part.value);
    }
    out
}

fn escape_into(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            other => out.push(other),
        }
    }
}

/// A single `key=value` component of a cache key.
///
/// Both halves use [`SmolStr`]; dates and period names stay inline.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct KeyPart {
    key: SmolStr,
    value: SmolStr,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl KeyPart {
    /// Creates a new key part.
    pub fn new<K: AsRef<str>, V: AsRef<str>>(key: K, value: V) -> Self {
        KeyPart {
            key: SmolStr::new(key),
            value: SmolStr::new(value),
        }
    }

    /// Returns the key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_key_is_stable_under_reordering() {
        let a = generate_key("p", [("b", "2"), ("a", "1")]);
        let b = generate_key("p", [("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_from_hash_map() {
        let mut params = HashMap::new();
        params.insert("start_date", "2025-01-01");
        params.insert("end_date", "2025-01-07");
        params.insert("period_type", "weekly");

        let key = CacheKey::new("sales_totals", params);
        assert_eq!(
            key.as_str(),
            "sales_totals:end_date=2025-01-07&period_type=weekly&start_date=2025-01-01"
        );
    }

    #[test]
    fn test_empty_params() {
        assert_eq!(generate_key("prefix", Vec::<(&str, &str)>::new()), "prefix:");
    }

    #[test]
    fn test_separators_are_escaped() {
        let a = generate_key("p", [("a", "1&b=2")]);
        let b = generate_key("p", [("a", "1"), ("b", "2")]);
        assert_ne!(a, b);
        assert_eq!(a, "p:a=1%26b%3D2");
    }

    #[test]
    fn test_distinct_prefixes() {
        let a = CacheKey::new("daily", [("d", "2025-01-01")]);
        let b = CacheKey::new("weekly", [("d", "2025-01-01")]);
        assert_ne!(a, b);
        assert_eq!(a.prefix(), "daily");
    }

    #[test]
    fn test_clone_equality() {
        let key = CacheKey::new("p", [("a", "1")]);
        let cloned = key.clone();
        assert_eq!(key, cloned);
        assert_eq!(cloned.parts().count(), 1);
    }
}
