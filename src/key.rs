//! Query keys.

use std::borrow::Borrow;
use std::fmt;

/// Caller-chosen identifier of one logical query
///
/// Keys must be stable across calls that represent the same query, typically
/// derived from a resource id (`"user:42"`). The engine only compares keys for
/// equality; it never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    /// Create a key from anything string-like
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for QueryKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&String> for QueryKey {
    fn from(key: &String) -> Self {
        Self(key.clone())
    }
}

impl From<&QueryKey> for QueryKey {
    fn from(key: &QueryKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for QueryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_conversions_agree() {
        let owned = String::from("user:1");
        assert_eq!(QueryKey::from("user:1"), QueryKey::from(&owned));
        assert_eq!(QueryKey::new("user:1"), QueryKey::from(owned));
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(QueryKey::from("todos"), 3);
        assert_eq!(map.get("todos"), Some(&3));
    }

    #[test]
    fn test_empty_key() {
        assert!(QueryKey::from("").is_empty());
        assert_eq!(QueryKey::from("a").to_string(), "a");
    }
}
