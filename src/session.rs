//! Session-scoped dispatch state.
//!
//! A [`SessionContext`] owns every piece of mutable bookkeeping the dispatcher
//! needs: throttle table, in-flight registry, response cache and debouncer.
//! Nothing is process-global; two sessions never observe each other.

use crate::cache::ResponseCache;
use crate::config::DispatchSettings;
use crate::dispatch::InflightRegistry;
use crate::resilience::{Debouncer, ThrottleTable};
use crate::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct SessionContext {
    id: String,
    settings: DispatchSettings,
    throttle: ThrottleTable,
    inflight: InflightRegistry,
    cache: ResponseCache,
    debouncer: Debouncer,
}

impl SessionContext {
    pub fn new(settings: DispatchSettings) -> Self {
        let cache = ResponseCache::in_memory(settings.cache_ttl());
        Self::with_cache(settings, cache)
    }

    pub fn with_cache(settings: DispatchSettings, cache: ResponseCache) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            throttle: ThrottleTable::new(settings.base_cooldown(), settings.cooldown_ceiling()),
            inflight: InflightRegistry::new(),
            debouncer: Debouncer::new(settings.debounce_window()),
            cache,
            settings,
        }
    }

    pub fn shared(settings: DispatchSettings) -> Arc<Self> {
        Arc::new(Self::new(settings))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn throttle(&self) -> &ThrottleTable {
        &self.throttle
    }

    pub fn inflight(&self) -> &InflightRegistry {
        &self.inflight
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Cancel all pending work tagged with `scope` (context switch to another entity).
    pub fn cancel_scope(&self, scope: &str) -> usize {
        let n = self.inflight.cancel_scope(scope);
        debug!(session = %self.id, scope, cancelled = n, "cancelled scope");
        n
    }

    /// Tear the session down: cancel everything in flight and forget all state.
    pub async fn end(&self) -> Result<()> {
        let cancelled = self.inflight.cancel_all();
        self.throttle.reset();
        self.cache.clear().await?;
        debug!(session = %self.id, cancelled, "session ended");
        Ok(())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DispatchSettings::default())
    }
}
