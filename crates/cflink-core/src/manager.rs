//! Record lifecycle: create, edit and delete paths that keep the local
//! store and the provider in step.
//!
//! Ordering rules:
//! - create: provider first, then local persist with the provider's id
//! - update: provider first, then local persist
//! - delete: provider first, then local delete
//!
//! A provider failure at any step leaves the local store untouched.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::model::{
    DEFAULT_MX_PRIORITY, DnsRecord, NewDnsRecord, NewLogEntry, RecordId, RecordPatch, RecordType,
    Ttl, Zone,
};
use crate::services::Services;
use crate::traits::{ProviderRecord, ProviderRecordRef};

/// Input for creating a record
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordRequest {
    pub zone_id: String,
    pub zone_name: String,
    pub record_type: RecordType,
    pub record_name: String,
    /// Ignored when the record follows the public IP
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ttl: Ttl,
    /// Defaults to false
    #[serde(default)]
    pub proxied: Option<bool>,
    /// MX only; defaults to 10
    #[serde(default)]
    pub priority: Option<u16>,
    /// Defaults to true for A/AAAA and false otherwise
    #[serde(default)]
    pub auto_update: Option<bool>,
}

/// Partial edit of a record; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub record_type: Option<RecordType>,
    #[serde(default)]
    pub record_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ttl: Option<Ttl>,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub auto_update: Option<bool>,
}

/// Owner-scoped record operations backed by the provider
#[derive(Debug, Clone)]
pub struct RecordManager {
    services: Services,
}

impl RecordManager {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Records of the caller, in creation order
    pub async fn list_records(&self, ctx: &RequestContext) -> Result<Vec<DnsRecord>> {
        self.services.records.list_for_owner(ctx.owner).await
    }

    pub async fn get_record(&self, ctx: &RequestContext, id: RecordId) -> Result<DnsRecord> {
        self.services.owned_record(ctx, id).await
    }

    /// Zones reachable with the caller's credential
    pub async fn list_zones(&self, ctx: &RequestContext) -> Result<Vec<Zone>> {
        let token = self.services.open_credential(ctx)?;

        match self.services.provider.list_zones(&token).await {
            Ok(zones) => {
                if zones.is_empty() {
                    self.services
                        .log(NewLogEntry::warning(
                            ctx.scope(),
                            "No zones found for this API token",
                        ))
                        .await;
                }
                Ok(zones)
            }
            Err(e) => {
                warn!(owner = ctx.owner, "Failed to list zones: {}", e);
                self.services
                    .log(
                        NewLogEntry::error(ctx.scope(), "Failed to fetch zones")
                            .with_details(e.reason()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Records of a zone as the provider sees them
    pub async fn list_provider_records(
        &self,
        ctx: &RequestContext,
        zone_id: &str,
    ) -> Result<Vec<ProviderRecord>> {
        require("zone_id", zone_id)?;
        let token = self.services.open_credential(ctx)?;

        self.services
            .provider
            .list_records(&token, zone_id)
            .await
            .inspect_err(|e| warn!(owner = ctx.owner, zone_id, "Failed to list records: {}", e))
    }

    /// Current public IP, fetched fresh
    pub async fn current_ip(&self, ctx: &RequestContext) -> Result<IpAddr> {
        self.services.lookup_ip(ctx).await
    }

    /// Create a record at the provider and persist it locally
    ///
    /// Auto-update A/AAAA records take the current public IP as content.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` / `Error::Conflict` before any external call
    /// - `Error::Network` if the IP lookup fails
    /// - `Error::Provider` if the provider rejects the record (nothing is persisted)
    pub async fn create_record(
        &self,
        ctx: &RequestContext,
        request: CreateRecordRequest,
    ) -> Result<DnsRecord> {
        let record_type = request.record_type;
        let auto_update = request.auto_update.unwrap_or(record_type.is_address());
        let proxied = request.proxied.unwrap_or(false);
        let zone_id = require("zone_id", &request.zone_id)?;
        let zone_name = require("zone_name", &request.zone_name)?;
        let record_name = require("record_name", &request.record_name)?;
        request.ttl.validate()?;
        check_proxied(record_type, proxied)?;

        if auto_update && !record_type.is_address() {
            return Err(Error::conflict(format!(
                "auto_update is only supported for A and AAAA records, not {}",
                record_type
            )));
        }

        let content = if auto_update {
            let ip = self.services.lookup_ip(ctx).await?;
            if !record_type.accepts_ip(&ip) {
                return Err(Error::validation(format!(
                    "Current public IP {} cannot be stored in a {} record",
                    ip, record_type
                )));
            }
            ip.to_string()
        } else {
            let content = request.content.as_deref().unwrap_or_default().trim().to_string();
            check_content(record_type, &content)?;
            content
        };

        let priority = match record_type {
            RecordType::Mx => Some(request.priority.unwrap_or(DEFAULT_MX_PRIORITY)),
            _ => None,
        };

        let new = NewDnsRecord {
            user_id: ctx.owner,
            zone_id,
            zone_name,
            provider_record_id: String::new(),
            record_type,
            record_name,
            content: content.clone(),
            ttl: request.ttl,
            proxied,
            priority,
            auto_update,
            last_updated_ip: auto_update.then(|| content.clone()),
        };
        let spec = new.clone().into_record(0).spec();

        let token = self.services.open_credential(ctx)?;
        let provider_record_id = match self.services.provider.create_record(&token, &spec).await {
            Ok(id) => id,
            Err(e) => {
                warn!(owner = ctx.owner, record = %spec.name, "Provider create failed: {}", e);
                self.services
                    .log(
                        NewLogEntry::error(
                            ctx.scope(),
                            format!("Failed to create DNS record {}", spec.name),
                        )
                        .with_details(e.reason()),
                    )
                    .await;
                return Err(e);
            }
        };

        let stored = self
            .services
            .records
            .create(NewDnsRecord {
                provider_record_id: provider_record_id.clone(),
                ..new
            })
            .await;

        let record = match stored {
            Ok(record) => record,
            Err(e) => {
                // Undo the remote create so no provider record is left behind
                let target = ProviderRecordRef {
                    zone_id: spec.zone_id.clone(),
                    record_id: provider_record_id,
                };
                warn!(record = %spec.name, "Local save failed after provider create: {}", e);
                let mut details = format!("Local save failed: {}", e.reason());
                if let Err(undo) = self.services.provider.delete_record(&token, &target).await {
                    warn!(
                        record_id = %target.record_id,
                        "Failed to remove provider record after local store error: {}",
                        undo
                    );
                    details = format!(
                        "{}; provider record {} could not be removed: {}",
                        details,
                        target.record_id,
                        undo.reason()
                    );
                }
                self.services
                    .log(
                        NewLogEntry::error(
                            ctx.scope(),
                            format!("Failed to create DNS record {}", spec.name),
                        )
                        .with_details(details),
                    )
                    .await;
                return Err(e);
            }
        };

        info!(
            record_id = record.id,
            record = %record.record_name,
            record_type = %record.record_type,
            "DNS record created"
        );
        self.services
            .log(
                NewLogEntry::success(
                    ctx.scope(),
                    format!("Created {} record {}", record.record_type, record.record_name),
                )
                .with_details(format!("Content: {}", record.content))
                .with_record(record.id),
            )
            .await;

        Ok(record)
    }

    /// Edit a record at the provider and locally
    ///
    /// A manual content change on an A/AAAA record also becomes the record's
    /// last applied IP, so the next reconciliation compares against it and
    /// restores the public IP if auto-update is still on.
    pub async fn update_record(
        &self,
        ctx: &RequestContext,
        id: RecordId,
        request: UpdateRecordRequest,
    ) -> Result<DnsRecord> {
        let _guard = self.services.locks.acquire(id).await;
        let current = self.services.owned_record(ctx, id).await?;

        let content = request.content.map(|c| c.trim().to_string());
        let record_name = match request.record_name {
            Some(ref name) => Some(require("record_name", name)?),
            None => None,
        };

        let mut patch = RecordPatch {
            record_type: request.record_type,
            record_name,
            content: content.clone(),
            ttl: request.ttl,
            proxied: request.proxied,
            priority: request.priority,
            auto_update: request.auto_update,
            ..RecordPatch::default()
        };

        let mut merged = current.clone();
        merged.apply(&patch);
        merged.ttl.validate()?;
        check_proxied(merged.record_type, merged.proxied)?;
        merged.validate()?;
        check_content(merged.record_type, &merged.content)?;

        if let Some(content) = content {
            if merged.record_type.is_address() {
                patch.last_updated_ip = Some(content);
            }
        }

        if merged.spec() != current.spec() {
            let token = self.services.open_credential(ctx)?;
            if let Err(e) = self
                .services
                .provider
                .update_record(&token, &current.provider_ref(), &merged.spec())
                .await
            {
                warn!(record_id = id, "Provider update failed: {}", e);
                self.services
                    .log(
                        NewLogEntry::error(
                            ctx.scope(),
                            format!("Failed to update DNS record {}", current.record_name),
                        )
                        .with_details(e.reason())
                        .with_record(id),
                    )
                    .await;
                return Err(e);
            }
        }

        let record = match self.services.records.update(id, patch).await {
            Ok(record) => record,
            Err(e) => {
                warn!(record_id = id, "Store write failed after provider update: {}", e);
                self.services
                    .log(
                        NewLogEntry::error(
                            ctx.scope(),
                            format!(
                                "DNS record {} updated at provider but local save failed",
                                current.record_name
                            ),
                        )
                        .with_details(e.reason())
                        .with_record(id),
                    )
                    .await;
                return Err(e);
            }
        };

        info!(record_id = id, record = %record.record_name, "DNS record updated");
        self.services
            .log(
                NewLogEntry::success(
                    ctx.scope(),
                    format!("Updated DNS record {}", record.record_name),
                )
                .with_record(id),
            )
            .await;

        Ok(record)
    }

    /// Delete a record at the provider, then locally
    ///
    /// # Errors
    ///
    /// If the provider call fails the local record is kept and the error is
    /// returned.
    pub async fn delete_record(&self, ctx: &RequestContext, id: RecordId) -> Result<()> {
        let _guard = self.services.locks.acquire(id).await;
        let record = self.services.owned_record(ctx, id).await?;
        let token = self.services.open_credential(ctx)?;

        if let Err(e) = self
            .services
            .provider
            .delete_record(&token, &record.provider_ref())
            .await
        {
            warn!(record_id = id, "Provider delete failed: {}", e);
            self.services
                .log(
                    NewLogEntry::error(
                        ctx.scope(),
                        format!("Failed to delete DNS record {}", record.record_name),
                    )
                    .with_details(e.reason())
                    .with_record(id),
                )
                .await;
            return Err(e);
        }

        self.services.records.delete(id).await?;

        info!(record_id = id, record = %record.record_name, "DNS record deleted");
        self.services
            .log(
                NewLogEntry::info(
                    ctx.scope(),
                    format!("Deleted DNS record {}", record.record_name),
                )
                .with_record(id),
            )
            .await;

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn check_proxied(record_type: RecordType, proxied: bool) -> Result<()> {
    if proxied && !record_type.is_proxiable() {
        return Err(Error::validation(format!(
            "{} records cannot be proxied",
            record_type
        )));
    }
    Ok(())
}

/// Manual content must be present, and an address of the right family for A/AAAA
fn check_content(record_type: RecordType, content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(Error::validation(format!(
            "content is required for {} records without auto_update",
            record_type
        )));
    }

    let valid = match record_type {
        RecordType::A => content.parse::<Ipv4Addr>().is_ok(),
        RecordType::Aaaa => content.parse::<Ipv6Addr>().is_ok(),
        _ => true,
    };
    if !valid {
        let family = if record_type == RecordType::A { "IPv4" } else { "IPv6" };
        return Err(Error::validation(format!(
            "'{}' is not a valid {} address",
            content, family
        )));
    }

    Ok(())
}
