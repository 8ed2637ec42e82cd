use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Pacing state of one logical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceThrottleState {
    /// Time of the most recent dispatch slot handed out (possibly in the future).
    pub last_dispatch: Option<Instant>,
    pub cooldown: Duration,
}

/// Per-resource minimum spacing between dispatches.
///
/// Slots are reserved at dispatch time: a caller asking for a slot gets
/// `max(now, last_dispatch + cooldown)` and that instant immediately becomes
/// the resource's new `last_dispatch`, so several queued callers are spaced
/// one cooldown apart. Resources never wait on each other.
pub struct ThrottleTable {
    base: Duration,
    ceiling: Duration,
    state: Mutex<HashMap<String, ResourceThrottleState>>,
}

impl ThrottleTable {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling: ceiling.max(base),
            state: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ResourceThrottleState>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh(&self) -> ResourceThrottleState {
        ResourceThrottleState {
            last_dispatch: None,
            cooldown: self.base,
        }
    }

    /// Reserve the next dispatch slot for `resource` and return when it opens.
    pub fn reserve(&self, resource: &str) -> Instant {
        let now = Instant::now();
        let fresh = self.fresh();
        let mut map = self.lock();
        let st = map.entry(resource.to_string()).or_insert(fresh);
        let ready = match st.last_dispatch {
            Some(last) => (last + st.cooldown).max(now),
            None => now,
        };
        st.last_dispatch = Some(ready);
        ready
    }

    /// Reserve a slot and sleep until it opens. Returns the dispatch instant.
    pub async fn acquire(&self, resource: &str) -> Instant {
        let at = self.reserve(resource);
        if at > Instant::now() {
            tokio::time::sleep_until(at).await;
        }
        at
    }

    /// Double the resource's cooldown, capped at the ceiling. Returns the new cooldown.
    pub fn on_rate_limited(&self, resource: &str) -> Duration {
        let fresh = self.fresh();
        let mut map = self.lock();
        let st = map.entry(resource.to_string()).or_insert(fresh);
        st.cooldown = st.cooldown.saturating_mul(2).min(self.ceiling);
        st.cooldown
    }

    /// Relax a grown cooldown by half, never below the base.
    pub fn on_success(&self, resource: &str) {
        let mut map = self.lock();
        if let Some(st) = map.get_mut(resource) {
            if st.cooldown > self.base {
                st.cooldown = (st.cooldown / 2).max(self.base);
            }
        }
    }

    pub fn cooldown(&self, resource: &str) -> Duration {
        self.lock()
            .get(resource)
            .map(|s| s.cooldown)
            .unwrap_or(self.base)
    }

    pub fn state(&self, resource: &str) -> Option<ResourceThrottleState> {
        self.lock().get(resource).copied()
    }

    /// Time until the next slot for `resource` would open, if it is not open now.
    pub fn estimated_wait(&self, resource: &str) -> Option<Duration> {
        let st = self.state(resource)?;
        let next = st.last_dispatch? + st.cooldown;
        let now = Instant::now();
        (next > now).then(|| next - now)
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}
