use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bookkeeping for one dispatched call that has not settled yet.
#[derive(Debug)]
struct PendingOperation {
    id: u64,
    resource: String,
    scope: Option<String>,
    started_at: Instant,
    token: CancellationToken,
}

/// Read-only view of a pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInfo {
    pub request_key: String,
    pub resource: String,
    pub scope: Option<String>,
    pub age: Duration,
}

/// Ticket returned by [`InflightRegistry::register`]; hand it back to
/// [`InflightRegistry::complete`] when the call settles.
#[derive(Debug, Clone)]
pub struct Registration {
    pub request_key: String,
    id: u64,
    token: CancellationToken,
}

impl Registration {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Table of in-flight operations keyed by request key.
///
/// Registering a key that is already pending cancels the older operation:
/// the newest call for a request key is the only one whose result matters.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    next_id: AtomicU64,
    ops: Mutex<HashMap<String, PendingOperation>>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingOperation>> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, request_key: &str, resource: &str, scope: Option<&str>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let op = PendingOperation {
            id,
            resource: resource.to_string(),
            scope: scope.map(str::to_string),
            started_at: Instant::now(),
            token: token.clone(),
        };
        if let Some(previous) = self.lock().insert(request_key.to_string(), op) {
            previous.token.cancel();
        }
        Registration {
            request_key: request_key.to_string(),
            id,
            token,
        }
    }

    /// Remove the entry, unless a newer registration has replaced it.
    pub fn complete(&self, registration: &Registration) {
        let mut ops = self.lock();
        if ops
            .get(&registration.request_key)
            .is_some_and(|op| op.id == registration.id)
        {
            ops.remove(&registration.request_key);
        }
    }

    pub fn cancel(&self, request_key: &str) -> bool {
        match self.lock().remove(request_key) {
            Some(op) => {
                op.token.cancel();
                true
            }
            None => false,
        }
    }

    fn cancel_where(&self, pred: impl Fn(&PendingOperation) -> bool) -> usize {
        let mut ops = self.lock();
        let keys: Vec<String> = ops
            .iter()
            .filter(|(_, op)| pred(op))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            if let Some(op) = ops.remove(key) {
                op.token.cancel();
            }
        }
        keys.len()
    }

    /// Cancel every operation tagged with `scope`, e.g. everything for one student.
    pub fn cancel_scope(&self, scope: &str) -> usize {
        self.cancel_where(|op| op.scope.as_deref() == Some(scope))
    }

    pub fn cancel_resource(&self, resource: &str) -> usize {
        self.cancel_where(|op| op.resource == resource)
    }

    pub fn cancel_all(&self) -> usize {
        self.cancel_where(|_| true)
    }

    pub fn contains(&self, request_key: &str) -> bool {
        self.lock().contains_key(request_key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<PendingInfo> {
        let mut out: Vec<PendingInfo> = self
            .lock()
            .iter()
            .map(|(key, op)| PendingInfo {
                request_key: key.clone(),
                resource: op.resource.clone(),
                scope: op.scope.clone(),
                age: op.started_at.elapsed(),
            })
            .collect();
        out.sort_by(|a, b| a.request_key.cmp(&b.request_key));
        out
    }
}
