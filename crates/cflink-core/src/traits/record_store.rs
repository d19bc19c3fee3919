// # Persistence Traits
//
// Defines the interfaces for record, activity-log and user persistence.
//
// ## Implementations
//
// - In-memory: `state::MemoryStore` (tests, ephemeral runs)
// - JSON file: `state::FileStore` (atomic writes with backup recovery)
//
// Both implementations enforce `model::validate_record_state` on every
// record write, so an invalid record can never be persisted.

use async_trait::async_trait;

use crate::model::{
    DnsRecord, LogEntry, LogQuery, NewDnsRecord, NewLogEntry, NewUser, RecordId, RecordPatch,
    User, UserId,
};

/// Trait for DNS record persistence
///
/// Ownership is not checked here; callers filter by `user_id`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record and assign it an id
    ///
    /// # Errors
    ///
    /// - `Error::Conflict` if `auto_update` is set on a non-address type
    /// - `Error::Validation` if required content is missing
    async fn create(&self, record: NewDnsRecord) -> crate::Result<DnsRecord>;

    /// Get a record by id
    async fn get(&self, id: RecordId) -> crate::Result<Option<DnsRecord>>;

    /// All records owned by `owner`, in id order
    async fn list_for_owner(&self, owner: UserId) -> crate::Result<Vec<DnsRecord>>;

    /// Records of `owner` that follow the public IP (auto_update A/AAAA)
    async fn list_auto_update(&self, owner: UserId) -> crate::Result<Vec<DnsRecord>>;

    /// Apply a partial update
    ///
    /// The merged record is validated before it is written.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if no record has this id.
    async fn update(&self, id: RecordId, patch: RecordPatch) -> crate::Result<DnsRecord>;

    /// Delete a record, returning whether it existed
    async fn delete(&self, id: RecordId) -> crate::Result<bool>;
}

/// Trait for the append-only activity log
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append an entry and return it with id and timestamp
    async fn append(&self, entry: NewLogEntry) -> crate::Result<LogEntry>;

    /// Read entries for a scope, newest first
    async fn list(&self, query: LogQuery) -> crate::Result<Vec<LogEntry>>;
}

/// Trait for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user
    ///
    /// # Errors
    ///
    /// `Error::Conflict` if the username or email is taken.
    async fn create_user(&self, user: NewUser) -> crate::Result<User>;

    async fn get_user(&self, id: UserId) -> crate::Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> crate::Result<Option<User>>;

    /// All users, in id order
    async fn list_users(&self) -> crate::Result<Vec<User>>;

    async fn count_users(&self) -> crate::Result<usize>;
}
