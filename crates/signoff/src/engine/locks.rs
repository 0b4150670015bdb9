//! Per-request mutual exclusion.
//!
//! Every mutating operation on a request holds that request's guard for its
//! whole load-decide-write cycle. Different requests never contend. Entries
//! are dropped from the registry once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct RequestLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl RequestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `request_id`.
    pub async fn acquire(&self, request_id: &str) -> RequestGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                map.entry(request_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let guard = lock.lock_owned().await;
        RequestGuard {
            request_id: request_id.to_string(),
            registry: Arc::clone(&self.inner),
            _guard: Some(guard),
        }
    }
}

/// Held while a request is being mutated. Released on drop.
pub struct RequestGuard {
    request_id: String,
    registry: Arc<Mutex<LockMap>>,
    _guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        // Release the async mutex before pruning so the strong count below
        // only reflects the registry and any waiters.
        self._guard.take();

        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = map.get(&self.request_id) {
            if Arc::strong_count(lock) == 1 {
                map.remove(&self.request_id);
            }
        }
    }
}
