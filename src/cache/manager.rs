//! Response cache with canonical keys.

use super::backend::{CacheBackend, MemoryCache};
use super::key::CacheKey;
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Short-lived response cache.
///
/// Every key is resolved through the alias index before touching the backend,
/// so a secondary key (for example "profile by name") and the canonical key
/// it is linked to ("profile by record id") always observe the same entry.
/// A key that was never linked is its own canonical key.
pub struct ResponseCache {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    aliases: RwLock<HashMap<String, String>>,
    stats: AtomicStats,
}

impl ResponseCache {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            aliases: RwLock::new(HashMap::new()),
            stats: AtomicStats::default(),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(CacheConfig::new().with_ttl(ttl), Box::new(MemoryCache::new()))
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    fn aliases_read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.aliases.read().unwrap_or_else(|p| p.into_inner())
    }

    fn aliases_write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.aliases.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Resolve a key to its canonical form.
    pub fn resolve(&self, key: &CacheKey) -> CacheKey {
        match self.aliases_read().get(key.as_str()) {
            Some(canonical) => CacheKey::new(canonical.clone()),
            None => key.clone(),
        }
    }

    /// Point `alias` at `canonical`. Later reads and writes through either key
    /// share one entry. Linking a canonical key to itself is ignored.
    pub fn link_alias(&self, alias: &CacheKey, canonical: &CacheKey) {
        let target = self.resolve(canonical);
        if alias.as_str() == target.as_str() {
            return;
        }
        let mut aliases = self.aliases_write();
        // Keep chains one hop long.
        for value in aliases.values_mut() {
            if value.as_str() == alias.as_str() {
                *value = target.key.clone();
            }
        }
        aliases.insert(alias.key.clone(), target.key);
    }

    /// Forget a secondary key. The canonical entry is left alone.
    pub fn unlink_alias(&self, alias: &CacheKey) -> bool {
        self.aliases_write().remove(alias.as_str()).is_some()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases_read().len()
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let canonical = self.resolve(key);
        match self.backend.get(&canonical).await {
            Ok(Some(v)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, canonical = %canonical, "cache hit");
                Ok(Some(v))
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Typed read. A payload that does not fit `T` counts as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(v) => match serde_json::from_value(v) {
                Ok(t) => Ok(Some(t)),
                Err(_) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &CacheKey, value: Value) -> Result<()> {
        self.set_with_ttl(key, value, self.config.ttl).await
    }

    pub async fn set_typed<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?).await
    }

    pub async fn set_with_ttl(&self, key: &CacheKey, value: Value, ttl: Duration) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let canonical = self.resolve(key);
        match self.backend.set(&canonical, value, ttl).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        let canonical = self.resolve(key);
        let removed = self.backend.delete(&canonical).await?;
        if removed {
            self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    /// Drop every entry and alias.
    pub async fn clear(&self) -> Result<()> {
        self.aliases_write().clear();
        self.backend.clear().await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NullCache;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn read_within_ttl_returns_written_payload() {
        let cache = ResponseCache::in_memory(Duration::from_secs(10));
        let key = CacheKey::new("profile_name_Jane Doe");
        let payload = json!({"name": "Jane Doe"});
        cache.set(&key, payload.clone()).await.unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key).await.unwrap(), Some(payload));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn alias_and_canonical_share_one_entry() {
        let cache = ResponseCache::in_memory(Duration::from_secs(10));
        let by_id = CacheKey::record("object_6", "123");
        let by_name = CacheKey::record_lookup("object_6", "field_90", "Jane Doe");
        cache.link_alias(&by_name, &by_id);

        cache.set(&by_name, json!({"v": 1})).await.unwrap();
        assert_eq!(cache.get(&by_id).await.unwrap(), Some(json!({"v": 1})));

        cache.set(&by_id, json!({"v": 2})).await.unwrap();
        assert_eq!(cache.get(&by_name).await.unwrap(), Some(json!({"v": 2})));

        assert!(cache.invalidate(&by_name).await.unwrap());
        assert_eq!(cache.get(&by_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unlinked_alias_no_longer_sees_the_entry() {
        let cache = ResponseCache::in_memory(Duration::from_secs(10));
        let by_id = CacheKey::record("object_3", "r9");
        let by_name = CacheKey::record_lookup("object_3", "field_90", "Jane Doe");
        cache.link_alias(&by_name, &by_id);
        cache.set(&by_id, json!({"id": "r9"})).await.unwrap();

        assert!(cache.unlink_alias(&by_name));
        assert!(!cache.unlink_alias(&by_name));
        assert_eq!(cache.get(&by_name).await.unwrap(), None);
        assert_eq!(cache.get(&by_id).await.unwrap(), Some(json!({"id": "r9"})));
    }

    #[tokio::test]
    async fn alias_chains_collapse_to_canonical() {
        let cache = ResponseCache::in_memory(Duration::from_secs(10));
        let a = CacheKey::new("a");
        let b = CacheKey::new("b");
        let c = CacheKey::new("c");
        cache.link_alias(&a, &b);
        cache.link_alias(&b, &c);
        assert_eq!(cache.resolve(&a), c);
        assert_eq!(cache.resolve(&b), c);
        cache.link_alias(&c, &c);
        assert_eq!(cache.alias_count(), 2);
    }

    #[tokio::test]
    async fn typed_reads_treat_shape_mismatch_as_miss() {
        let cache = ResponseCache::in_memory(Duration::from_secs(10));
        let key = CacheKey::new("k");
        cache.set(&key, json!("not a number")).await.unwrap();
        let v: Option<u32> = cache.get_as(&key).await.unwrap();
        assert!(v.is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn disabled_cache_is_inert() {
        let cache = ResponseCache::new(
            CacheConfig::new().with_enabled(false),
            Box::new(MemoryCache::new()),
        );
        let key = CacheKey::new("k");
        cache.set(&key, json!(1)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);

        let null = ResponseCache::new(CacheConfig::new(), Box::new(NullCache::new()));
        assert_eq!(null.backend_name(), "null");
    }
}
