//! Core traits for cflink
//!
//! This module defines the seams between the reconciliation logic and the
//! outside world.
//!
//! - [`DnsProvider`]: Zone listing and record CRUD at the DNS provider
//! - [`IpSource`]: Discovery of the host's current public IP
//! - [`RecordStore`], [`LogSink`], [`UserStore`]: Persistence
//! - [`CredentialCipher`]: Encryption of stored provider tokens

pub mod credentials;
pub mod dns_provider;
pub mod ip_source;
pub mod record_store;

pub use credentials::{ApiToken, CredentialCipher, EncryptedCredential};
pub use dns_provider::{DnsProvider, ProviderRecord, ProviderRecordRef, RecordSpec};
pub use ip_source::{IpSource, IpVersion};
pub use record_store::{LogSink, RecordStore, UserStore};
