//! Test doubles and common utilities for contract tests
//!
//! The doubles count every call so tests can assert exactly which
//! provider requests a code path issued.

#![allow(dead_code)]

use cflink_core::error::{Error, Result};
use cflink_core::traits::{
    ApiToken, CredentialCipher, DnsProvider, EncryptedCredential, IpSource, ProviderRecord,
    ProviderRecordRef, RecordSpec,
};
use cflink_core::{
    DnsRecord, LogEntry, LogLevel, LogQuery, LogScope, LogSink, MemoryStore, NewDnsRecord,
    RecordId, RecordLocks, RecordManager, RecordPatch, RecordStore, RecordType, Reconciler,
    RequestContext, Services, Ttl, UserId, Zone,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OWNER: UserId = 1;
pub const TOKEN: &str = "test-token";

/// An IpSource whose answer the test controls
///
/// `None` makes every lookup fail with a network error.
#[derive(Clone)]
pub struct SettableIpSource {
    ip: Arc<Mutex<Option<IpAddr>>>,
    call_count: Arc<AtomicUsize>,
}

impl SettableIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Arc::new(Mutex::new(Some(ip.parse().unwrap()))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, ip: &str) {
        *self.ip.lock().unwrap() = Some(ip.parse().unwrap());
    }

    pub fn fail(&self) {
        *self.ip.lock().unwrap() = None;
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for SettableIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let ip = *self.ip.lock().unwrap();
        ip.ok_or_else(|| Error::network("All IP lookup services failed"))
    }
}

/// A mock DnsProvider that tracks calls and can be told to fail
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    create_calls: Arc<AtomicUsize>,
    content_update_calls: Arc<AtomicUsize>,
    full_update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    /// (provider record id, new content) for every content update
    content_updates: Arc<Mutex<Vec<(String, String)>>>,
    /// Provider record ids whose updates are rejected
    reject_updates: Arc<Mutex<HashSet<String>>>,
    fail_create: Arc<Mutex<Option<Error>>>,
    fail_delete: Arc<Mutex<Option<Error>>>,
    zones: Arc<Mutex<Vec<Zone>>>,
    next_id: Arc<AtomicUsize>,
    /// Artificial latency for content updates
    delay: Arc<Mutex<Option<Duration>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    seen_tokens: Arc<Mutex<Vec<String>>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn content_update_calls(&self) -> usize {
        self.content_update_calls.load(Ordering::SeqCst)
    }

    pub fn full_update_calls(&self) -> usize {
        self.full_update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn content_updates(&self) -> Vec<(String, String)> {
        self.content_updates.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn reject_updates_for(&self, provider_record_id: &str) {
        self.reject_updates
            .lock()
            .unwrap()
            .insert(provider_record_id.to_string());
    }

    pub fn fail_create_with(&self, err: Error) {
        *self.fail_create.lock().unwrap() = Some(err);
    }

    pub fn fail_delete_with(&self, err: Error) {
        *self.fail_delete.lock().unwrap() = Some(err);
    }

    pub fn set_zones(&self, zones: Vec<Zone>) {
        *self.zones.lock().unwrap() = zones;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn see(&self, token: &ApiToken) {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.expose().to_string());
    }

    fn take_error(slot: &Mutex<Option<Error>>) -> Option<Error> {
        slot.lock().unwrap().as_ref().map(|e| match e {
            Error::Network(msg) => Error::network(msg.clone()),
            other => Error::provider("mock", other.reason()),
        })
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self, token: &ApiToken) -> Result<Vec<Zone>> {
        self.see(token);
        Ok(self.zones.lock().unwrap().clone())
    }

    async fn list_records(&self, token: &ApiToken, _zone_id: &str) -> Result<Vec<ProviderRecord>> {
        self.see(token);
        Ok(Vec::new())
    }

    async fn create_record(&self, token: &ApiToken, _spec: &RecordSpec) -> Result<String> {
        self.see(token);
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::take_error(&self.fail_create) {
            return Err(err);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("cf-new-{}", n))
    }

    async fn update_record_content(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        content: &str,
    ) -> Result<()> {
        self.see(token);
        self.content_update_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject_updates.lock().unwrap().contains(&record.record_id) {
            return Err(Error::provider("mock", "Record is locked"));
        }

        self.content_updates
            .lock()
            .unwrap()
            .push((record.record_id.clone(), content.to_string()));
        Ok(())
    }

    async fn update_record(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        _spec: &RecordSpec,
    ) -> Result<()> {
        self.see(token);
        self.full_update_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_updates.lock().unwrap().contains(&record.record_id) {
            return Err(Error::provider("mock", "Record is locked"));
        }
        Ok(())
    }

    async fn delete_record(&self, token: &ApiToken, _record: &ProviderRecordRef) -> Result<()> {
        self.see(token);
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        match Self::take_error(&self.fail_delete) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Cipher that stores the token bytes as-is
pub struct PlainCipher;

impl CredentialCipher for PlainCipher {
    fn encrypt(&self, token: &ApiToken) -> Result<EncryptedCredential> {
        Ok(EncryptedCredential {
            nonce: Vec::new(),
            ciphertext: token.expose().as_bytes().to_vec(),
        })
    }

    fn decrypt(&self, credential: &EncryptedCredential) -> Result<ApiToken> {
        String::from_utf8(credential.ciphertext.clone())
            .map(ApiToken::new)
            .map_err(|e| Error::crypto(e.to_string()))
    }
}

/// Record store that can be told to fail writes
///
/// Reads and deletes go straight to the wrapped `MemoryStore`.
#[derive(Clone)]
pub struct FlakyRecordStore {
    inner: MemoryStore,
    fail_creates: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
}

impl FlakyRecordStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_creates: Arc::new(AtomicBool::new(false)),
            fail_updates: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordStore for FlakyRecordStore {
    async fn create(&self, record: NewDnsRecord) -> Result<DnsRecord> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::storage("disk full"));
        }
        self.inner.create(record).await
    }

    async fn get(&self, id: RecordId) -> Result<Option<DnsRecord>> {
        self.inner.get(id).await
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<DnsRecord>> {
        self.inner.list_for_owner(owner).await
    }

    async fn list_auto_update(&self, owner: UserId) -> Result<Vec<DnsRecord>> {
        self.inner.list_auto_update(owner).await
    }

    async fn update(&self, id: RecordId, patch: RecordPatch) -> Result<DnsRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::storage("disk full"));
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// Everything a contract test needs, wired the way the daemon wires it
pub struct Harness {
    pub store: MemoryStore,
    /// The record store the reconciler and manager write through
    pub records: FlakyRecordStore,
    pub provider: MockDnsProvider,
    pub ip: SettableIpSource,
    pub reconciler: Reconciler,
    pub manager: RecordManager,
    pub ctx: RequestContext,
}

impl Harness {
    pub fn new(ip: &str) -> Self {
        let store = MemoryStore::new();
        let provider = MockDnsProvider::new();
        let ip = SettableIpSource::new(ip);
        let records = FlakyRecordStore::new(store.clone());

        let services = Services {
            provider: Arc::new(provider.clone()),
            ip_source: Arc::new(ip.clone()),
            records: Arc::new(records.clone()),
            logs: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            cipher: Arc::new(PlainCipher),
            locks: RecordLocks::new(),
        };

        let ctx = RequestContext::new(
            OWNER,
            PlainCipher.encrypt(&ApiToken::new(TOKEN)).unwrap(),
        );

        Self {
            reconciler: Reconciler::new(services.clone()),
            manager: RecordManager::new(services),
            store,
            records,
            provider,
            ip,
            ctx,
        }
    }

    /// Insert a record directly into the store, bypassing the provider
    pub async fn seed(
        &self,
        name: &str,
        record_type: RecordType,
        content: &str,
        auto_update: bool,
        last_updated_ip: Option<&str>,
    ) -> DnsRecord {
        self.seed_for(OWNER, name, record_type, content, auto_update, last_updated_ip)
            .await
    }

    pub async fn seed_for(
        &self,
        owner: UserId,
        name: &str,
        record_type: RecordType,
        content: &str,
        auto_update: bool,
        last_updated_ip: Option<&str>,
    ) -> DnsRecord {
        self.store
            .create(NewDnsRecord {
                user_id: owner,
                zone_id: "zone-1".to_string(),
                zone_name: "example.com".to_string(),
                provider_record_id: format!("cf-{}", name),
                record_type,
                record_name: name.to_string(),
                content: content.to_string(),
                ttl: Ttl::Auto,
                proxied: false,
                priority: None,
                auto_update,
                last_updated_ip: last_updated_ip.map(str::to_string),
            })
            .await
            .unwrap()
    }

    pub async fn record(&self, id: cflink_core::RecordId) -> Option<DnsRecord> {
        self.store.get(id).await.unwrap()
    }

    /// Owner's log entries, newest first
    pub async fn logs(&self) -> Vec<LogEntry> {
        self.store
            .list(LogQuery::new(LogScope::User(OWNER)).page(None, Some(500)))
            .await
            .unwrap()
    }

    pub async fn logs_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.logs()
            .await
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}
