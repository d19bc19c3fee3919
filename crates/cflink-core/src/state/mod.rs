// # Store Implementations
//
// This module provides implementations of the persistence traits
// (`RecordStore`, `LogSink`, `UserStore`) for different strategies.
//
// Both stores keep the same `StoreData` document and differ only in
// whether it is written to disk after each mutation.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    DnsRecord, LogEntry, LogQuery, NewDnsRecord, NewLogEntry, NewUser, RecordId, RecordPatch,
    User, UserId, validate_record_state,
};

/// Activity log entries kept across all scopes; older ones are dropped
pub const MAX_LOG_ENTRIES: usize = 10_000;

/// Everything cflink persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreData {
    #[serde(default)]
    next_user_id: UserId,
    #[serde(default)]
    next_record_id: RecordId,
    #[serde(default)]
    next_log_id: u64,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    records: Vec<DnsRecord>,
    /// Oldest first
    #[serde(default)]
    logs: Vec<LogEntry>,
}

impl StoreData {
    pub(crate) fn insert_record(&mut self, new: NewDnsRecord) -> Result<DnsRecord> {
        validate_record_state(new.record_type, new.auto_update, &new.content)?;

        self.next_record_id += 1;
        let record = new.into_record(self.next_record_id);
        self.records.push(record.clone());
        Ok(record)
    }

    pub(crate) fn record(&self, id: RecordId) -> Option<DnsRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    pub(crate) fn records_for_owner(&self, owner: UserId) -> Vec<DnsRecord> {
        self.records
            .iter()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect()
    }

    pub(crate) fn auto_update_records(&self, owner: UserId) -> Vec<DnsRecord> {
        self.records
            .iter()
            .filter(|r| r.user_id == owner && r.auto_update && r.record_type.is_address())
            .cloned()
            .collect()
    }

    pub(crate) fn update_record(&mut self, id: RecordId, patch: &RecordPatch) -> Result<DnsRecord> {
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found(format!("DNS record {} not found", id)))?;

        let mut merged = slot.clone();
        merged.apply(patch);
        merged.validate()?;

        *slot = merged.clone();
        Ok(merged)
    }

    pub(crate) fn remove_record(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub(crate) fn append_log(&mut self, entry: NewLogEntry) -> LogEntry {
        self.next_log_id += 1;
        let entry = entry.into_entry(self.next_log_id);
        self.logs.push(entry.clone());
        if self.logs.len() > MAX_LOG_ENTRIES {
            let excess = self.logs.len() - MAX_LOG_ENTRIES;
            self.logs.drain(..excess);
        }
        entry
    }

    pub(crate) fn logs(&self, query: &LogQuery) -> Vec<LogEntry> {
        self.logs
            .iter()
            .rev()
            .filter(|entry| entry.scope() == query.scope)
            .skip(query.skip)
            .take(query.limit)
            .cloned()
            .collect()
    }

    pub(crate) fn insert_user(&mut self, new: NewUser) -> Result<User> {
        if self.users.iter().any(|u| u.username == new.username) {
            return Err(Error::conflict(format!(
                "Username '{}' is already taken",
                new.username
            )));
        }
        if self.users.iter().any(|u| u.email == new.email) {
            return Err(Error::conflict(format!(
                "Email '{}' is already registered",
                new.email
            )));
        }

        self.next_user_id += 1;
        let user = new.into_user(self.next_user_id);
        self.users.push(user.clone());
        Ok(user)
    }

    pub(crate) fn user(&self, id: UserId) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    pub(crate) fn user_by_name(&self, username: &str) -> Option<User> {
        self.users.iter().find(|u| u.username == username).cloned()
    }

    pub(crate) fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    pub(crate) fn user_count(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn record_count(&self) -> usize {
        self.records.len()
    }
}
