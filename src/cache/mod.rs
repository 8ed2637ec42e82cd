//! # Response Cache
//!
//! A short-lived, time-boxed store that absorbs redundant identical fetches
//! triggered by bursts of overlapping events for the same entity.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseCache`] | TTL cache with canonical keys, alias index and statistics |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`MemoryCache`] | In-memory backend |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`CacheKey`] | Canonical and alias keys |
//!
//! ## Example
//!
//! ```rust
//! use vespa_knack::cache::{CacheKey, ResponseCache};
//! use std::time::Duration;
//!
//! # async fn demo() -> vespa_knack::Result<()> {
//! let cache = ResponseCache::in_memory(Duration::from_secs(10));
//! let by_id = CacheKey::record("object_6", "5f1a");
//! let by_name = CacheKey::record_lookup("object_6", "field_90", "Jane Doe");
//! cache.link_alias(&by_name, &by_id);
//! cache.set(&by_id, serde_json::json!({"name": "Jane Doe"})).await?;
//! assert!(cache.get(&by_name).await?.is_some());
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::CacheKey;
pub use manager::{CacheConfig, CacheStats, ResponseCache};
