//! Domain model: DNS record intents, activity log entries and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::traits::EncryptedCredential;
use crate::traits::dns_provider::{ProviderRecordRef, RecordSpec};

/// Local identifier of a DNS record
pub type RecordId = u64;

/// Local identifier of a user
pub type UserId = u64;

/// Default MX preference when none is given
pub const DEFAULT_MX_PRIORITY: u16 = 10;

/// Lowest explicit TTL the provider accepts (seconds)
pub const MIN_TTL_SECS: u32 = 60;

/// Highest explicit TTL the provider accepts (seconds)
pub const MAX_TTL_SECS: u32 = 86_400;

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Free text
    Txt,
    /// Mail exchanger
    Mx,
}

impl RecordType {
    /// Wire name of the type ("A", "AAAA", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
        }
    }

    /// Address-type records are the only ones that can follow the public IP.
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }

    /// Whether the provider allows proxying for this type.
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }

    /// Whether `ip` belongs to the address family this type stores.
    ///
    /// Always false for non-address types.
    pub fn accepts_ip(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
            _ => false,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            "MX" => Ok(RecordType::Mx),
            other => Err(Error::validation(format!(
                "Unsupported record type '{}'. Supported: A, AAAA, CNAME, TXT, MX",
                other
            ))),
        }
    }
}

/// Record time-to-live
///
/// On the wire a TTL of `1` means "automatic", following the provider's
/// convention; any other value is a number of seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Ttl {
    /// Provider-chosen TTL
    #[default]
    Auto,
    /// Explicit TTL in seconds
    Seconds(u32),
}

impl Ttl {
    /// Check the TTL is one the provider will accept.
    pub fn validate(&self) -> Result<()> {
        match self {
            Ttl::Auto => Ok(()),
            Ttl::Seconds(secs) if (MIN_TTL_SECS..=MAX_TTL_SECS).contains(secs) => Ok(()),
            Ttl::Seconds(secs) => Err(Error::validation(format!(
                "TTL must be 1 (automatic) or between {} and {} seconds. Got: {}",
                MIN_TTL_SECS, MAX_TTL_SECS, secs
            ))),
        }
    }
}

impl From<u32> for Ttl {
    fn from(value: u32) -> Self {
        if value == 1 { Ttl::Auto } else { Ttl::Seconds(value) }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        match ttl {
            Ttl::Auto => 1,
            Ttl::Seconds(secs) => secs,
        }
    }
}

/// A DNS record intent as persisted locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Local id
    pub id: RecordId,
    /// Owning user
    pub user_id: UserId,
    /// Provider zone id
    pub zone_id: String,
    /// Zone (domain) name
    pub zone_name: String,
    /// Id assigned by the provider at creation
    pub provider_record_id: String,
    /// Record type
    pub record_type: RecordType,
    /// Record name (fully qualified or relative to the zone)
    pub record_name: String,
    /// IP literal or target value
    pub content: String,
    /// Time-to-live
    pub ttl: Ttl,
    /// Route through the provider's edge network
    pub proxied: bool,
    /// MX preference
    #[serde(default)]
    pub priority: Option<u16>,
    /// Follow the public IP (A/AAAA only)
    pub auto_update: bool,
    /// IP most recently pushed to the provider
    pub last_updated_ip: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: Option<DateTime<Utc>>,
}

impl DnsRecord {
    /// Pointer to the remote copy of this record
    pub fn provider_ref(&self) -> ProviderRecordRef {
        ProviderRecordRef {
            zone_id: self.zone_id.clone(),
            record_id: self.provider_record_id.clone(),
        }
    }

    /// Full desired state, as sent to the provider
    pub fn spec(&self) -> RecordSpec {
        RecordSpec {
            zone_id: self.zone_id.clone(),
            record_type: self.record_type,
            name: self.record_name.clone(),
            content: self.content.clone(),
            ttl: self.ttl,
            proxied: self.proxied,
            priority: self.effective_priority(),
        }
    }

    /// Priority as the provider needs it: only MX records carry one.
    pub fn effective_priority(&self) -> Option<u16> {
        match self.record_type {
            RecordType::Mx => Some(self.priority.unwrap_or(DEFAULT_MX_PRIORITY)),
            _ => None,
        }
    }

    /// True when the record already points at `ip` and that IP was the last one applied.
    pub fn is_synced_with(&self, ip: &str) -> bool {
        self.last_updated_ip.as_deref() == Some(ip) && self.content == ip
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(record_type) = patch.record_type {
            self.record_type = record_type;
        }
        if let Some(ref record_name) = patch.record_name {
            self.record_name = record_name.clone();
        }
        if let Some(ref content) = patch.content {
            self.content = content.clone();
        }
        if let Some(ttl) = patch.ttl {
            self.ttl = ttl;
        }
        if let Some(proxied) = patch.proxied {
            self.proxied = proxied;
        }
        if let Some(priority) = patch.priority {
            self.priority = Some(priority);
        }
        if let Some(auto_update) = patch.auto_update {
            self.auto_update = auto_update;
        }
        if let Some(ref ip) = patch.last_updated_ip {
            self.last_updated_ip = Some(ip.clone());
        }
        self.updated_at = Some(patch.updated_at.unwrap_or_else(Utc::now));
    }

    /// Check the record-state invariants enforced at write time.
    pub fn validate(&self) -> Result<()> {
        validate_record_state(self.record_type, self.auto_update, &self.content)
    }
}

/// Write-time invariants shared by every `RecordStore` implementation.
///
/// - `auto_update` is only allowed on A/AAAA records (`Conflict` otherwise)
/// - content must be non-empty unless the record is an auto-updated A/AAAA
pub fn validate_record_state(
    record_type: RecordType,
    auto_update: bool,
    content: &str,
) -> Result<()> {
    if auto_update && !record_type.is_address() {
        return Err(Error::conflict(format!(
            "auto_update is only supported for A and AAAA records, not {}",
            record_type
        )));
    }

    if content.trim().is_empty() && !(auto_update && record_type.is_address()) {
        return Err(Error::validation(format!(
            "content is required for {} records without auto_update",
            record_type
        )));
    }

    Ok(())
}

/// Data needed to insert a record into a `RecordStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDnsRecord {
    pub user_id: UserId,
    pub zone_id: String,
    pub zone_name: String,
    pub provider_record_id: String,
    pub record_type: RecordType,
    pub record_name: String,
    pub content: String,
    pub ttl: Ttl,
    pub proxied: bool,
    pub priority: Option<u16>,
    pub auto_update: bool,
    pub last_updated_ip: Option<String>,
}

impl NewDnsRecord {
    /// Materialize the stored form under a freshly allocated id.
    pub fn into_record(self, id: RecordId) -> DnsRecord {
        DnsRecord {
            id,
            user_id: self.user_id,
            zone_id: self.zone_id,
            zone_name: self.zone_name,
            provider_record_id: self.provider_record_id,
            record_type: self.record_type,
            record_name: self.record_name,
            content: self.content,
            ttl: self.ttl,
            proxied: self.proxied,
            priority: self.priority,
            auto_update: self.auto_update,
            last_updated_ip: self.last_updated_ip,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Partial update: every `Some` field is written, `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub record_type: Option<RecordType>,
    pub record_name: Option<String>,
    pub content: Option<String>,
    pub ttl: Option<Ttl>,
    pub proxied: Option<bool>,
    pub priority: Option<u16>,
    pub auto_update: Option<bool>,
    pub last_updated_ip: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
    /// Patch written after a successful reconciliation to `ip`.
    pub fn applied_ip(ip: &str) -> Self {
        Self {
            content: Some(ip.to_string()),
            last_updated_ip: Some(ip.to_string()),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// DNS zone as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub paused: bool,
}

/// Severity of an activity log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Who a log entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScope {
    /// Activity of one user
    User(UserId),
    /// Activity not tied to a user (scheduler, startup)
    System,
}

impl LogScope {
    fn user_id(&self) -> Option<UserId> {
        match self {
            LogScope::User(id) => Some(*id),
            LogScope::System => None,
        }
    }
}

/// Append-only activity log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_id: Option<UserId>,
    pub record_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Scope this entry was written under
    pub fn scope(&self) -> LogScope {
        match self.user_id {
            Some(id) => LogScope::User(id),
            None => LogScope::System,
        }
    }
}

/// A log entry before it is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub level: LogLevel,
    pub message: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub scope: LogScope,
    pub record_id: Option<RecordId>,
}

impl NewLogEntry {
    pub fn new(level: LogLevel, scope: LogScope, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            details: None,
            ip_address: None,
            scope,
            record_id: None,
        }
    }

    pub fn info(scope: LogScope, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, scope, message)
    }

    pub fn success(scope: LogScope, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, scope, message)
    }

    pub fn warning(scope: LogScope, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, scope, message)
    }

    pub fn error(scope: LogScope, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, scope, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_record(mut self, record_id: RecordId) -> Self {
        self.record_id = Some(record_id);
        self
    }

    /// Stamp the entry with an id and the current time.
    pub fn into_entry(self, id: u64) -> LogEntry {
        LogEntry {
            id,
            level: self.level,
            message: self.message,
            details: self.details,
            ip_address: self.ip_address,
            user_id: self.scope.user_id(),
            record_id: self.record_id,
            created_at: Utc::now(),
        }
    }
}

/// Default page size for log reads
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Largest page a caller may request
pub const MAX_LOG_LIMIT: usize = 500;

/// Paginated log read, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub scope: LogScope,
    pub skip: usize,
    pub limit: usize,
}

impl LogQuery {
    pub fn new(scope: LogScope) -> Self {
        Self {
            scope,
            skip: 0,
            limit: DEFAULT_LOG_LIMIT,
        }
    }

    /// Set pagination, clamping `limit` to `1..=MAX_LOG_LIMIT`.
    pub fn page(mut self, skip: Option<usize>, limit: Option<usize>) -> Self {
        self.skip = skip.unwrap_or(0);
        self.limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
        self
    }
}

/// Account holding the encrypted provider credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub credential: EncryptedCredential,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub credential: EncryptedCredential,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            credential: self.credential,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
