//! IP reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Observing the current public IP via IpSource
//! - Deciding whether a record already matches it (idempotency)
//! - Pushing the new content via DnsProvider
//! - Persisting the outcome and leaving an activity log entry
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ HTTP / scheduler │─── RequestContext ───┐
//! └──────────────────┘                      │
//!                                           ▼
//!                                  ┌──────────────┐
//!                                  │  Reconciler  │
//!                                  └──────────────┘
//!                                           │
//!         ┌─────────────────────┬───────────┴─────────┬─────────────────────┐
//!         ▼                     ▼                     ▼                     ▼
//! ┌─────────────┐       ┌──────────────┐      ┌─────────────┐       ┌─────────────┐
//! │  IpSource   │       │ DnsProvider  │      │ RecordStore │       │   LogSink   │
//! │ (observe)   │       │ (update)     │      │ (persist)   │       │  (audit)    │
//! └─────────────┘       └──────────────┘      └─────────────┘       └─────────────┘
//! ```
//!
//! ## Flow for one record
//!
//! 1. Take the per-record lock and re-read the record
//! 2. If content and last applied IP already equal the observed IP, skip
//! 3. Otherwise update the content at the provider
//! 4. On success, write content and last applied IP to the store
//! 5. Log SUCCESS or ERROR; a failure is returned as a value
//!
//! A store write that fails after the provider accepted the change is
//! logged as an ERROR and returned as `Failed`: provider and store now
//! disagree, and the next pass retries the update.

use serde::Serialize;
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::error::Result;
use crate::model::{
    DnsRecord, LogLevel, LogScope, NewLogEntry, RecordId, RecordPatch, UserId,
};
use crate::services::Services;
use crate::traits::ApiToken;

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Provider content was changed to the observed IP
    Updated {
        previous_content: String,
        ip: String,
    },
    /// Record already pointed at the observed IP
    Skipped { ip: String },
    /// Provider call failed or the IP could not be applied
    Failed { reason: String },
    /// Record type never follows the public IP
    NotApplicable,
}

/// A record that could not be reconciled in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub record_id: RecordId,
    pub record_name: String,
    pub reason: String,
}

/// Outcome of reconciling all of an owner's auto-update records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// IP every record was compared against (`None` when nothing was checked)
    pub current_ip: Option<String>,
    pub checked: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchSummary {
    /// One-line description used for the aggregate log entry
    pub fn message(&self) -> String {
        if self.checked == 0 {
            return "No records with auto-update enabled".to_string();
        }
        format!(
            "Checked {} records: {} updated, {} already up to date, {} failed",
            self.checked, self.updated, self.skipped, self.failed
        )
    }

    fn record(&mut self, record: &DnsRecord, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Skipped { .. } | ReconcileOutcome::NotApplicable => {
                self.skipped += 1
            }
            ReconcileOutcome::Failed { reason } => self.fail(record, reason),
        }
    }

    fn fail(&mut self, record: &DnsRecord, reason: String) {
        self.failed += 1;
        self.failures.push(RecordFailure {
            record_id: record.id,
            record_name: record.record_name.clone(),
            reason,
        });
    }
}

/// Per-user result of a scheduler run
#[derive(Debug)]
pub struct UserRun {
    pub user_id: UserId,
    pub result: Result<BatchSummary>,
}

/// Keeps address records pointed at the current public IP
///
/// ## Serialization
///
/// Every provider mutation runs under the record's entry in the shared
/// `RecordLocks` table, so a manual "update IP" racing a batch run for the
/// same record queues behind it instead of issuing a second update.
#[derive(Debug, Clone)]
pub struct Reconciler {
    services: Services,
}

impl Reconciler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Reconcile one record on behalf of `ctx`
    ///
    /// Works regardless of the record's `auto_update` flag; only the record
    /// type decides applicability.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the record does not exist or is not owned by the caller
    /// - `Error::Network` if the public IP cannot be determined
    /// - `Error::Crypto` if the stored credential cannot be opened
    ///
    /// A rejected provider update is not an error: it is returned as
    /// `ReconcileOutcome::Failed`.
    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        record_id: RecordId,
    ) -> Result<ReconcileOutcome> {
        let record = self.services.owned_record(ctx, record_id).await?;

        if !record.record_type.is_address() {
            debug!(
                record_id,
                record_type = %record.record_type,
                "Record type does not follow the public IP, nothing to do"
            );
            return Ok(ReconcileOutcome::NotApplicable);
        }

        let token = self.services.open_credential(ctx)?;
        let ip = self.services.lookup_ip(ctx).await?;

        self.apply(ctx, &token, record_id, ip, false).await
    }

    /// Reconcile every auto-update A/AAAA record of the caller
    ///
    /// The public IP is fetched once and every record is compared against
    /// it. Records are processed one after another; a failing record never
    /// stops the rest.
    pub async fn reconcile_all(&self, ctx: &RequestContext) -> Result<BatchSummary> {
        let records = self.services.records.list_auto_update(ctx.owner).await?;

        if records.is_empty() {
            let summary = BatchSummary::default();
            debug!(owner = ctx.owner, "No auto-update records");
            self.services
                .log(NewLogEntry::info(ctx.scope(), summary.message()))
                .await;
            return Ok(summary);
        }

        let token = self.services.open_credential(ctx)?;
        let ip = self.services.lookup_ip(ctx).await?;

        let mut summary = BatchSummary {
            current_ip: Some(ip.to_string()),
            checked: records.len(),
            ..BatchSummary::default()
        };

        for record in &records {
            match self.apply(ctx, &token, record.id, ip, true).await {
                Ok(outcome) => summary.record(record, outcome),
                Err(e) => {
                    warn!(record_id = record.id, "Reconciliation failed: {}", e);
                    summary.fail(record, e.reason());
                }
            }
        }

        let level = if summary.failed == 0 {
            LogLevel::Info
        } else {
            LogLevel::Warning
        };
        info!(
            owner = ctx.owner,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch reconciliation finished"
        );
        let mut entry =
            NewLogEntry::new(level, ctx.scope(), summary.message()).with_ip(ip.to_string());
        if !summary.failures.is_empty() {
            let details = summary
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.record_name, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            entry = entry.with_details(details);
        }
        self.services.log(entry).await;

        Ok(summary)
    }

    /// Run `reconcile_all` for every active user
    ///
    /// Used by the periodic scheduler. A user whose run fails is logged at
    /// system scope and the remaining users are still processed.
    pub async fn reconcile_everyone(&self) -> Result<Vec<UserRun>> {
        let users = self.services.users.list_users().await?;
        let mut runs = Vec::with_capacity(users.len());

        for user in users.iter().filter(|u| u.is_active) {
            let ctx = RequestContext::from(user);
            let result = self.reconcile_all(&ctx).await;

            if let Err(ref e) = result {
                warn!(user_id = user.id, "Scheduled reconciliation failed: {}", e);
                self.services
                    .log(
                        NewLogEntry::error(
                            LogScope::System,
                            format!("Scheduled IP update failed for user {}", user.username),
                        )
                        .with_details(e.reason()),
                    )
                    .await;
            }

            runs.push(UserRun {
                user_id: user.id,
                result,
            });
        }

        Ok(runs)
    }

    /// Bring one record in line with `ip`, holding its lock throughout
    ///
    /// With `batch` set, a record whose auto-update flag was switched off
    /// since the batch was listed is left alone, and an up-to-date record
    /// gets no entry of its own.
    async fn apply(
        &self,
        ctx: &RequestContext,
        token: &ApiToken,
        record_id: RecordId,
        ip: IpAddr,
        batch: bool,
    ) -> Result<ReconcileOutcome> {
        let _guard = self.services.locks.acquire(record_id).await;

        // Re-read under the lock: a queued caller sees the previous caller's result
        let record = self.services.owned_record(ctx, record_id).await?;
        if batch && !record.auto_update {
            return Ok(ReconcileOutcome::NotApplicable);
        }

        let ip_str = ip.to_string();
        let scope = ctx.scope();

        if record.is_synced_with(&ip_str) {
            debug!(record_id, ip = %ip_str, "Record already up to date");
            // Batch skips are covered by the aggregate entry
            if !batch {
                self.services
                    .log(
                        NewLogEntry::info(
                            scope,
                            format!("DNS record {} already up to date", record.record_name),
                        )
                        .with_ip(ip_str.clone())
                        .with_record(record_id),
                    )
                    .await;
            }
            return Ok(ReconcileOutcome::Skipped { ip: ip_str });
        }

        if !record.record_type.accepts_ip(&ip) {
            let reason = format!(
                "Observed IP {} cannot be stored in a {} record",
                ip_str, record.record_type
            );
            warn!(record_id, "{}", reason);
            self.services
                .log(
                    NewLogEntry::error(
                        scope,
                        format!("Failed to update DNS record {}", record.record_name),
                    )
                    .with_details(reason.clone())
                    .with_ip(ip_str)
                    .with_record(record_id),
                )
                .await;
            return Ok(ReconcileOutcome::Failed { reason });
        }

        let target = record.provider_ref();
        match self
            .services
            .provider
            .update_record_content(token, &target, &ip_str)
            .await
        {
            Ok(()) => {
                if let Err(e) = self
                    .services
                    .records
                    .update(record_id, RecordPatch::applied_ip(&ip_str))
                    .await
                {
                    let reason = format!("Local save failed: {}", e.reason());
                    warn!(
                        record_id,
                        ip = %ip_str,
                        "Provider updated but store write failed: {}",
                        e
                    );
                    self.services
                        .log(
                            NewLogEntry::error(
                                scope,
                                format!(
                                    "DNS record {} updated at provider but local save failed",
                                    record.record_name
                                ),
                            )
                            .with_details(reason.clone())
                            .with_ip(ip_str)
                            .with_record(record_id),
                        )
                        .await;
                    return Ok(ReconcileOutcome::Failed { reason });
                }

                info!(
                    record_id,
                    record = %record.record_name,
                    previous = %record.content,
                    ip = %ip_str,
                    "DNS record updated"
                );
                self.services
                    .log(
                        NewLogEntry::success(
                            scope,
                            format!("DNS record {} updated to {}", record.record_name, ip_str),
                        )
                        .with_details(format!(
                            "Previous content: {}",
                            display_content(&record.content)
                        ))
                        .with_ip(ip_str.clone())
                        .with_record(record_id),
                    )
                    .await;

                Ok(ReconcileOutcome::Updated {
                    previous_content: record.content,
                    ip: ip_str,
                })
            }
            Err(e) => {
                let reason = e.reason();
                warn!(
                    record_id,
                    provider = self.services.provider.provider_name(),
                    "Provider update failed: {}",
                    e
                );
                self.services
                    .log(
                        NewLogEntry::error(
                            scope,
                            format!("Failed to update DNS record {}", record.record_name),
                        )
                        .with_details(reason.clone())
                        .with_ip(ip_str)
                        .with_record(record_id),
                    )
                    .await;
                Ok(ReconcileOutcome::Failed { reason })
            }
        }
    }
}

fn display_content(content: &str) -> &str {
    if content.is_empty() { "(empty)" } else { content }
}
