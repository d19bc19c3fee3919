// # File Store
//
// File-based implementation of the persistence traits with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of the previous state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "state": {
//     "next_user_id": 1,
//     "next_record_id": 1,
//     "next_log_id": 3,
//     "users": [ ... ],
//     "records": [ ... ],
//     "logs": [ ... ]
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{
    DnsRecord, LogEntry, LogQuery, NewDnsRecord, NewLogEntry, NewUser, RecordId, RecordPatch,
    User, UserId,
};
use crate::state::StoreData;
use crate::traits::{LogSink, RecordStore, UserStore};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based store with crash recovery
///
/// Every mutation is applied to a copy of the document, written to disk,
/// and only then made visible. A failed write leaves the in-memory state
/// untouched.
///
/// # Example
///
/// ```rust,no_run
/// use cflink_core::{FileStore, UserStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/cflink/cflink.json").await?;
///     println!("{} users", store.count_users().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<RwLock<StoreData>>,
}

/// Serializable state file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    state: StoreData,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If it is corrupted, load the backup instead
    /// 4. If both fail, start with empty state
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let state = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Path of the main state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file, falling back to the backup on corruption
    async fn load_state_with_recovery(path: &Path) -> Result<StoreData, Error> {
        let err = match Self::load_state(path).await {
            Ok(state) => {
                tracing::debug!(
                    users = state.user_count(),
                    records = state.record_count(),
                    "Loaded state from {}",
                    path.display()
                );
                return Ok(state);
            }
            Err(e) => e,
        };

        if !matches!(err, Error::Json(_)) {
            return Err(err);
        }

        tracing::warn!(
            "State file appears corrupted: {}. Attempting recovery from backup.",
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(StoreData::default());
        }

        match Self::load_state(&backup_path).await {
            Ok(state) => {
                tracing::info!(
                    records = state.record_count(),
                    "Recovered state from backup"
                );

                if let Err(restore_err) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore state file from backup: {}", restore_err);
                }

                Ok(state)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also corrupted: {}. Starting with empty state.",
                    backup_err
                );
                Ok(StoreData::default())
            }
        }
    }

    /// Load state from file; a missing file is an empty state
    async fn load_state(path: &Path) -> Result<StoreData, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(StoreData::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::storage(format!("Failed to read state file {}: {}", path.display(), e))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.state)
    }

    /// Write a state document to disk atomically
    async fn write_state(&self, state: &StoreData) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            state: state.clone(),
        };

        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::storage(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::storage(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Apply `f` to a copy of the state, persist it, then publish it
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.write_state(&next).await?;
        *guard = next;
        Ok(out)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn create(&self, record: NewDnsRecord) -> Result<DnsRecord, Error> {
        self.mutate(|state| state.insert_record(record)).await
    }

    async fn get(&self, id: RecordId) -> Result<Option<DnsRecord>, Error> {
        Ok(self.state.read().await.record(id))
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<DnsRecord>, Error> {
        Ok(self.state.read().await.records_for_owner(owner))
    }

    async fn list_auto_update(&self, owner: UserId) -> Result<Vec<DnsRecord>, Error> {
        Ok(self.state.read().await.auto_update_records(owner))
    }

    async fn update(&self, id: RecordId, patch: RecordPatch) -> Result<DnsRecord, Error> {
        self.mutate(|state| state.update_record(id, &patch)).await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, Error> {
        if self.state.read().await.record(id).is_none() {
            return Ok(false);
        }
        self.mutate(|state| Ok(state.remove_record(id))).await
    }
}

#[async_trait]
impl LogSink for FileStore {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, Error> {
        self.mutate(|state| Ok(state.append_log(entry))).await
    }

    async fn list(&self, query: LogQuery) -> Result<Vec<LogEntry>, Error> {
        Ok(self.state.read().await.logs(&query))
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        self.mutate(|state| state.insert_user(user)).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Error> {
        Ok(self.state.read().await.user(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.state.read().await.user_by_name(username))
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        Ok(self.state.read().await.users())
    }

    async fn count_users(&self) -> Result<usize, Error> {
        Ok(self.state.read().await.user_count())
    }
}
