//! Shared collaborators of the reconciler and the record manager.

use std::net::IpAddr;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::locks::RecordLocks;
use crate::model::{DnsRecord, NewLogEntry, RecordId};
use crate::traits::{
    ApiToken, CredentialCipher, DnsProvider, IpSource, LogSink, RecordStore, UserStore,
};

/// Everything the reconciliation and lifecycle paths talk to
///
/// Cheap to clone; the daemon builds one and hands copies to the
/// `Reconciler`, the `RecordManager` and the HTTP layer.
#[derive(Clone)]
pub struct Services {
    pub provider: Arc<dyn DnsProvider>,
    pub ip_source: Arc<dyn IpSource>,
    pub records: Arc<dyn RecordStore>,
    pub logs: Arc<dyn LogSink>,
    pub users: Arc<dyn UserStore>,
    pub cipher: Arc<dyn CredentialCipher>,
    pub locks: RecordLocks,
}

impl Services {
    /// Decrypt the caller's provider token for the duration of a call
    pub(crate) fn open_credential(&self, ctx: &RequestContext) -> Result<ApiToken> {
        self.cipher.decrypt(&ctx.credential)
    }

    /// Load a record that must belong to the caller
    ///
    /// Records of other users are reported as missing.
    pub(crate) async fn owned_record(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> Result<DnsRecord> {
        match self.records.get(id).await? {
            Some(record) if record.user_id == ctx.owner => Ok(record),
            _ => Err(Error::not_found(format!("DNS record {} not found", id))),
        }
    }

    /// Fetch the public IP, leaving an ERROR entry when no service answers
    pub(crate) async fn lookup_ip(&self, ctx: &RequestContext) -> Result<IpAddr> {
        match self.ip_source.current().await {
            Ok(ip) => Ok(ip),
            Err(e) => {
                tracing::error!(owner = ctx.owner, "Public IP lookup failed: {}", e);
                self.log(
                    NewLogEntry::error(ctx.scope(), "Failed to get current public IP")
                        .with_details(e.reason()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Append an activity entry
    ///
    /// Append failures are reported through tracing only.
    pub async fn log(&self, entry: NewLogEntry) {
        if let Err(e) = self.logs.append(entry).await {
            tracing::error!("Failed to append activity log entry: {}", e);
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("provider", &self.provider.provider_name())
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
