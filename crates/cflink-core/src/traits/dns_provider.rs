// # DNS Provider Trait
//
// Defines the gateway to the DNS provider's record API.
//
// ## Implementations
//
// - Cloudflare: `cflink-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cflink_core::{ApiToken, DnsProvider};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let token = ApiToken::new("cf-token");
//
//     for zone in provider.list_zones(&token).await? {
//         println!("{} ({})", zone.name, zone.id);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{RecordType, Ttl, Zone};
use crate::traits::ApiToken;

/// Location of a record at the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderRecordRef {
    /// Zone id
    pub zone_id: String,
    /// Provider-assigned record id
    pub record_id: String,
}

/// Desired state of a record, as sent on create and full update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub zone_id: String,
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: Ttl,
    pub proxied: bool,
    /// Only set for MX records
    pub priority: Option<u16>,
}

/// A record as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: String,
    /// Kept as a string: the provider may hold types cflink does not manage
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub priority: Option<u16>,
}

/// Trait for DNS provider implementations
///
/// Every method takes the caller's decrypted token explicitly; an
/// implementation holds no per-user state.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure as a value
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed call is reported once)
/// - ❌ Access the record store or the activity log
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
/// - ❌ Cache state beyond a single request
///
/// # Errors
///
/// - `Error::Provider` when the provider answers with a rejection
/// - `Error::NotFound` when the provider does not know the zone or record
/// - `Error::Network` when it cannot be reached or the call times out
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List the zones visible to `token`
    async fn list_zones(&self, token: &ApiToken) -> crate::Result<Vec<Zone>>;

    /// List all records in a zone
    async fn list_records(
        &self,
        token: &ApiToken,
        zone_id: &str,
    ) -> crate::Result<Vec<ProviderRecord>>;

    /// Create a record and return the provider-assigned id
    async fn create_record(&self, token: &ApiToken, spec: &RecordSpec) -> crate::Result<String>;

    /// Replace only the content of an existing record
    ///
    /// Used by reconciliation; type, name, TTL and proxy flag stay as they are.
    async fn update_record_content(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        content: &str,
    ) -> crate::Result<()>;

    /// Replace the full state of an existing record
    async fn update_record(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        spec: &RecordSpec,
    ) -> crate::Result<()>;

    /// Delete a record
    ///
    /// A record that is already gone at the provider counts as deleted.
    async fn delete_record(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
    ) -> crate::Result<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
