// # Memory Store
//
// In-memory implementation of the persistence traits.
//
// ## Crash Behavior
//
// - All records, users and logs are lost on restart
// - No recovery possible (state is in-memory only)
//
// ## When to Use
//
// - Testing environments
// - Throwaway runs where nothing needs to survive a restart

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{
    DnsRecord, LogEntry, LogQuery, NewDnsRecord, NewLogEntry, NewUser, RecordId, RecordPatch,
    User, UserId,
};
use crate::state::StoreData;
use crate::traits::{LogSink, RecordStore, UserStore};

/// In-memory store
///
/// Clones share the same underlying data.
///
/// # Example
///
/// ```rust,no_run
/// use cflink_core::{LogQuery, LogScope, LogSink, MemoryStore, NewLogEntry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///
///     store.append(NewLogEntry::info(LogScope::System, "started")).await?;
///
///     let entries = store.list(LogQuery::new(LogScope::System)).await?;
///     assert_eq!(entries.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreData>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of DNS records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.record_count()
    }

    /// Check if the store holds no DNS records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: NewDnsRecord) -> Result<DnsRecord, Error> {
        self.inner.write().await.insert_record(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<DnsRecord>, Error> {
        Ok(self.inner.read().await.record(id))
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<DnsRecord>, Error> {
        Ok(self.inner.read().await.records_for_owner(owner))
    }

    async fn list_auto_update(&self, owner: UserId) -> Result<Vec<DnsRecord>, Error> {
        Ok(self.inner.read().await.auto_update_records(owner))
    }

    async fn update(&self, id: RecordId, patch: RecordPatch) -> Result<DnsRecord, Error> {
        self.inner.write().await.update_record(id, &patch)
    }

    async fn delete(&self, id: RecordId) -> Result<bool, Error> {
        Ok(self.inner.write().await.remove_record(id))
    }
}

#[async_trait]
impl LogSink for MemoryStore {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, Error> {
        Ok(self.inner.write().await.append_log(entry))
    }

    async fn list(&self, query: LogQuery) -> Result<Vec<LogEntry>, Error> {
        Ok(self.inner.read().await.logs(&query))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        self.inner.write().await.insert_user(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Error> {
        Ok(self.inner.read().await.user(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.inner.read().await.user_by_name(username))
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        Ok(self.inner.read().await.users())
    }

    async fn count_users(&self) -> Result<usize, Error> {
        Ok(self.inner.read().await.user_count())
    }
}
