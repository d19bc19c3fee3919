//! Shared helpers for HTTP API tests
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`
//! against an in-memory store, a scripted provider and a fixed IP source.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use cflink_core::traits::{
    ApiToken, DnsProvider, IpSource, ProviderRecord, ProviderRecordRef, RecordSpec,
};
use cflink_core::{Error, MemoryStore, RecordLocks, Result, Services, Zone};
use cflinkd::auth::jwt::JwtConfig;
use cflinkd::{AesGcmCipher, AppState, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const CF_TOKEN: &str = "cf-api-token";
pub const PASSWORD: &str = "correct horse battery";

/// IP source with a settable answer
#[derive(Clone)]
pub struct FixedIpSource {
    ip: Arc<Mutex<Option<IpAddr>>>,
}

impl FixedIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Arc::new(Mutex::new(Some(ip.parse().unwrap()))),
        }
    }

    pub fn set(&self, ip: &str) {
        *self.ip.lock().unwrap() = Some(ip.parse().unwrap());
    }

    pub fn fail(&self) {
        *self.ip.lock().unwrap() = None;
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let ip = *self.ip.lock().unwrap();
        ip.ok_or_else(|| Error::network("All IP lookup services failed"))
    }
}

/// Provider double that accepts everything unless told otherwise
#[derive(Clone, Default)]
pub struct StubProvider {
    next_id: Arc<AtomicUsize>,
    content_updates: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    reject_updates: Arc<Mutex<HashSet<String>>>,
    seen_tokens: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    pub fn reject_updates_for(&self, provider_record_id: &str) {
        self.reject_updates
            .lock()
            .unwrap()
            .insert(provider_record_id.to_string());
    }

    pub fn content_updates(&self) -> usize {
        self.content_updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    fn see(&self, token: &ApiToken) {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.expose().to_string());
    }
}

#[async_trait::async_trait]
impl DnsProvider for StubProvider {
    async fn list_zones(&self, token: &ApiToken) -> Result<Vec<Zone>> {
        self.see(token);
        Ok(vec![Zone {
            id: "zone-1".to_string(),
            name: "example.com".to_string(),
            status: "active".to_string(),
            paused: false,
        }])
    }

    async fn list_records(&self, token: &ApiToken, zone_id: &str) -> Result<Vec<ProviderRecord>> {
        self.see(token);
        Ok(vec![ProviderRecord {
            id: "cf-existing".to_string(),
            record_type: "A".to_string(),
            name: format!("www.{}", zone_id),
            content: "1.2.3.4".to_string(),
            ttl: 1,
            proxied: false,
            priority: None,
        }])
    }

    async fn create_record(&self, token: &ApiToken, _spec: &RecordSpec) -> Result<String> {
        self.see(token);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cf-{}", n))
    }

    async fn update_record_content(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        _content: &str,
    ) -> Result<()> {
        self.see(token);
        if self.reject_updates.lock().unwrap().contains(&record.record_id) {
            return Err(Error::provider("stub", "record is locked"));
        }
        self.content_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_record(
        &self,
        token: &ApiToken,
        _record: &ProviderRecordRef,
        _spec: &RecordSpec,
    ) -> Result<()> {
        self.see(token);
        Ok(())
    }

    async fn delete_record(&self, token: &ApiToken, _record: &ProviderRecordRef) -> Result<()> {
        self.see(token);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// Router plus handles on its doubles
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub provider: StubProvider,
    pub ip: FixedIpSource,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn new(ip: &str) -> Self {
        let provider = StubProvider::default();
        let ip = FixedIpSource::new(ip);
        let store = MemoryStore::new();

        let services = Services {
            provider: Arc::new(provider.clone()),
            ip_source: Arc::new(ip.clone()),
            records: Arc::new(store.clone()),
            logs: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            cipher: Arc::new(AesGcmCipher::new(SECRET).unwrap()),
            locks: RecordLocks::default(),
        };
        let state = AppState::new(services, JwtConfig::new(SECRET, 60));

        Self {
            router: build_router(state.clone()),
            state,
            provider,
            ip,
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Run first-run setup and return the issued access token
    pub async fn setup_admin(&self) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/auth/setup",
                None,
                Some(json!({
                    "username": "admin",
                    "email": "admin@example.com",
                    "password": PASSWORD,
                    "cloudflare_api_token": CF_TOKEN,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create an auto-update A record through the API and return its JSON
    pub async fn create_a_record(&self, token: &str, name: &str) -> Value {
        let response = self
            .post(
                "/api/v1/dns/",
                token,
                json!({
                    "zone_id": "zone-1",
                    "zone_name": "example.com",
                    "record_type": "A",
                    "record_name": name,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
