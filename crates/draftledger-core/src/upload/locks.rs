//! Per-draft async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::draft::DraftId;

/// Registry of one async lock per draft, created on demand.
///
/// Entries are dropped once nobody holds or waits for them.
#[derive(Debug, Default)]
pub struct DraftLocks {
    locks: Mutex<HashMap<DraftId, Weak<AsyncMutex<()>>>>,
}

impl DraftLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `draft_id`.
    ///
    /// The lock is released when the guard is dropped, including when the
    /// waiting or holding future is cancelled.
    pub async fn lock(&self, draft_id: DraftId) -> OwnedMutexGuard<()> {
        self.entry(draft_id).lock_owned().await
    }

    fn entry(&self, draft_id: DraftId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(&draft_id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(draft_id, Arc::downgrade(&lock));
        lock
    }

    /// Number of drafts with a live lock.
    #[must_use]
    pub fn len(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }

    /// Whether no draft is locked or waited for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
