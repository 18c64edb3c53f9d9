#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// At most one in-flight mutating operation per tenant key; waiters queue
/// in arrival order. tokio's mutex hands the lock to waiters FIFO and a
/// failed operation simply drops its guard, so one bad request can never
/// poison the queue for its tenant. Distinct keys never contend.
#[derive(Debug, Default)]
pub struct WriteLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl WriteLocks {
    pub fn new() -> Self {
        WriteLocks::default()
    }

    /// Acquires the write slot for `key`, suspending behind any operation
    /// already holding or awaiting it. Hold the guard across the whole
    /// load-mutate-save sequence.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                map.entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drops map entries nobody holds or awaits, bounding memory across
    /// many short-lived tenants. Cloning only ever happens under the map
    /// mutex, so a strong count of one proves the map holds the last
    /// reference.
    pub fn prune(&self) -> usize {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
