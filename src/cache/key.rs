//! Cache key generation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub key: String,
}

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Canonical key of a record: derived from its durable id.
    pub fn record(object: &str, id: &str) -> Self {
        Self::new(format!("record:{}:{}", object, id))
    }

    /// Secondary key for "the record of `object` whose `field` equals `value`".
    pub fn record_lookup(object: &str, field: &str, value: &str) -> Self {
        Self::new(format!("record:{}:{}={}", object, field, value))
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_are_readable() {
        assert_eq!(CacheKey::record("object_6", "abc").as_str(), "record:object_6:abc");
        assert_eq!(
            CacheKey::record_lookup("object_6", "field_90", "Jane Doe").to_string(),
            "record:object_6:field_90=Jane Doe"
        );
    }
}
