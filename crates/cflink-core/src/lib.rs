// # cflink-core
//
// Core library for cflink, a small service that keeps Cloudflare DNS
// records pointed at the host's current public IP.
//
// ## Architecture Overview
//
// - **DnsProvider**: Trait for zone listing and record CRUD at the DNS provider
// - **IpSource**: Trait for discovering the current public IP
// - **RecordStore / LogSink / UserStore**: Persistence traits
// - **CredentialCipher**: Opaque encrypt/decrypt capability for provider tokens
// - **Reconciler**: Compares stored records with the observed IP and pushes updates
// - **RecordManager**: Create/update/delete paths that keep local and remote state aligned
//
// ## Design Principles
//
// 1. **Explicit context**: Every call carries a `RequestContext`; there is no ambient session
// 2. **Injected gateways**: Provider and IP lookup are trait objects, replaceable by test doubles
// 3. **Results, not panics**: Per-record failures are values; a batch never aborts on one record
// 4. **Serialized mutations**: At most one in-flight provider mutation per record id

pub mod context;
pub mod engine;
pub mod error;
pub mod locks;
pub mod manager;
pub mod model;
pub mod services;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use context::RequestContext;
pub use engine::{BatchSummary, ReconcileOutcome, Reconciler, RecordFailure, UserRun};
pub use error::{Error, Result};
pub use locks::RecordLocks;
pub use manager::{CreateRecordRequest, RecordManager, UpdateRecordRequest};
pub use model::{
    DnsRecord, LogEntry, LogLevel, LogQuery, LogScope, NewDnsRecord, NewLogEntry, NewUser,
    RecordId, RecordPatch, RecordType, Ttl, User, UserId, Zone,
};
pub use services::Services;
pub use state::{FileStore, MemoryStore};
pub use traits::{
    ApiToken, CredentialCipher, DnsProvider, EncryptedCredential, IpSource, IpVersion, LogSink,
    ProviderRecord, ProviderRecordRef, RecordSpec, RecordStore, UserStore,
};
