use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Trailing-edge debounce keyed by an arbitrary string.
///
/// Every call to [`Debouncer::settle`] waits one window; only the most recent
/// trigger for a key resolves to `true`. Bursts of events for the same entity
/// therefore collapse into one unit of work.
pub struct Debouncer {
    window: Duration,
    seq: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seq: AtomicU64::new(0),
            latest: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn settle(&self, key: &str) -> bool {
        let ticket = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(key.to_string(), ticket);
        let _pending = PendingTicket {
            debouncer: self,
            key,
            ticket,
        };

        tokio::time::sleep(self.window).await;

        // Release the lock before the ticket guard drops.
        let fired = self.lock().get(key) == Some(&ticket);
        fired
    }

    /// Number of keys with a trigger still waiting out its window.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}

/// Clears a trigger's ticket once it settles or is abandoned, unless a newer
/// trigger for the same key has replaced it.
struct PendingTicket<'a> {
    debouncer: &'a Debouncer,
    key: &'a str,
    ticket: u64,
}

impl Drop for PendingTicket<'_> {
    fn drop(&mut self) {
        let mut latest = self.debouncer.lock();
        if latest.get(self.key) == Some(&self.ticket) {
            latest.remove(self.key);
        }
    }
}
