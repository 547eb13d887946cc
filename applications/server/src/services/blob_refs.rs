/// Per-blob locks serializing reference changes
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed by `stream_ref`
///
/// Whoever adds a record pointing at a blob (share redemption) and whoever
/// decides a blob is unreferenced (delete) hold the same lock, so a copy can
/// never be inserted between the reference check and the reap.
#[derive(Clone, Default)]
pub struct BlobRefLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl BlobRefLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, stream_ref: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(stream_ref.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
