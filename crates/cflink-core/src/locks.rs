//! Per-record mutual exclusion.
//!
//! Provider mutations for one record id never overlap: a second caller for
//! the same id waits until the first one finishes. Different ids proceed
//! independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

use crate::model::RecordId;

/// Table of per-record async locks
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct RecordLocks {
    table: Arc<Mutex<HashMap<RecordId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    ///
    /// The returned guard releases the lock when dropped.
    pub async fn acquire(&self, id: RecordId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop entries nobody holds or waits on
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }
}
