// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare v4 API implementation of
// `cflink_core::DnsProvider`.
//
// ## Behaviour
//
// - One HTTP request per trait call (listing follows pagination)
// - No retry, no backoff, no caching
// - Bounded timeout on every request; a timeout is a network error
// - Deleting a record that is already gone succeeds
//
// ## Security Requirements
//
// - The API token is passed per call and never stored or logged
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cflink_core::traits::{ApiToken, DnsProvider, ProviderRecord, ProviderRecordRef, RecordSpec};
use cflink_core::{Error, Result, Zone};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used when listing zones and records
const PAGE_SIZE: u32 = 100;

const PROVIDER: &str = "cloudflare";

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// Isolated, stateless and single-shot. The caller's token arrives with
/// every call and is only placed in the `Authorization` header.
#[derive(Debug, Clone)]
pub struct CloudflareProvider {
    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl CloudflareProvider {
    /// Create a provider against `api_base` with a per-request timeout
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
            return Err(Error::config(format!(
                "Cloudflare API base must use HTTP or HTTPS scheme. Got: {}",
                api_base
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { api_base, client })
    }

    /// Provider for the public Cloudflare API with the default timeout
    pub fn live() -> Result<Self> {
        Self::new(CLOUDFLARE_API_BASE, DEFAULT_HTTP_TIMEOUT)
    }

    /// Send one request and unwrap the Cloudflare envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        token: &ApiToken,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Envelope<T>> {
        if token.is_empty() {
            return Err(Error::provider(PROVIDER, "API token is empty"));
        }

        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(%method, path, "Cloudflare API request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(token.expose())
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            Error::provider(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(Error::provider(PROVIDER, describe_errors(&envelope.errors)));
        }

        Ok(envelope)
    }

    /// GET every page of a listing endpoint
    async fn list_all<T: DeserializeOwned>(&self, token: &ApiToken, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let query = [("page", page.to_string()), ("per_page", PAGE_SIZE.to_string())];
            let envelope: Envelope<Vec<T>> =
                self.call(Method::GET, token, path, &query, None).await?;

            items.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }

        Ok(items)
    }

    fn record_path(record: &ProviderRecordRef) -> String {
        format!("/zones/{}/dns_records/{}", record.zone_id, record.record_id)
    }
}

/// JSON body for create and full update
fn record_body(spec: &RecordSpec) -> Value {
    let mut body = json!({
        "type": spec.record_type.as_str(),
        "name": spec.name,
        "content": spec.content,
        "ttl": u32::from(spec.ttl),
        "proxied": spec.proxied,
    });
    if let Some(priority) = spec.priority {
        body["priority"] = json!(priority);
    }
    body
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::network("Cloudflare API request timed out")
    } else if e.is_connect() {
        Error::network(format!("Could not reach Cloudflare API: {}", e))
    } else {
        Error::network(format!("HTTP request failed: {}", e))
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "Cloudflare reported failure without details".to_string();
    }
    errors
        .iter()
        .map(|e| {
            if e.code == 0 {
                e.message.clone()
            } else {
                format!("{} (code {})", e.message, e.code)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map a non-success HTTP status to a provider error
fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<Envelope<Value>>(body)
        .ok()
        .filter(|env| !env.errors.is_empty())
        .map(|env| describe_errors(&env.errors));

    if status == StatusCode::NOT_FOUND {
        return Error::not_found(format!(
            "Cloudflare: {}",
            detail.unwrap_or_else(|| status.to_string())
        ));
    }

    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        ),
        409 => format!(
            "Conflict: {}",
            detail.unwrap_or_else(|| "record is being modified elsewhere".to_string())
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!(
            "Cloudflare server error (transient): {}{}",
            status,
            detail.map(|d| format!(" - {}", d)).unwrap_or_default()
        ),
        _ => detail.unwrap_or_else(|| format!("Request failed: {}", status)),
    };

    Error::provider(PROVIDER, message)
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self, token: &ApiToken) -> Result<Vec<Zone>> {
        let zones: Vec<Zone> = self.list_all(token, "/zones").await?;
        tracing::debug!(count = zones.len(), "Listed Cloudflare zones");
        Ok(zones)
    }

    async fn list_records(&self, token: &ApiToken, zone_id: &str) -> Result<Vec<ProviderRecord>> {
        self.list_all(token, &format!("/zones/{}/dns_records", zone_id))
            .await
    }

    async fn create_record(&self, token: &ApiToken, spec: &RecordSpec) -> Result<String> {
        let path = format!("/zones/{}/dns_records", spec.zone_id);
        let envelope: Envelope<CreatedRecord> = self
            .call(Method::POST, token, &path, &[], Some(record_body(spec)))
            .await?;

        let created = envelope
            .result
            .ok_or_else(|| Error::provider(PROVIDER, "Create response did not include a record"))?;

        tracing::info!(
            record = %spec.name,
            record_type = %spec.record_type,
            record_id = %created.id,
            "Cloudflare record created"
        );
        Ok(created.id)
    }

    async fn update_record_content(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        content: &str,
    ) -> Result<()> {
        let _: Envelope<Value> = self
            .call(
                Method::PATCH,
                token,
                &Self::record_path(record),
                &[],
                Some(json!({ "content": content })),
            )
            .await?;

        tracing::info!(record_id = %record.record_id, content, "Cloudflare record content updated");
        Ok(())
    }

    async fn update_record(
        &self,
        token: &ApiToken,
        record: &ProviderRecordRef,
        spec: &RecordSpec,
    ) -> Result<()> {
        let _: Envelope<Value> = self
            .call(
                Method::PUT,
                token,
                &Self::record_path(record),
                &[],
                Some(record_body(spec)),
            )
            .await?;

        tracing::info!(record_id = %record.record_id, "Cloudflare record overwritten");
        Ok(())
    }

    async fn delete_record(&self, token: &ApiToken, record: &ProviderRecordRef) -> Result<()> {
        let result: Result<Envelope<Value>> = self
            .call(Method::DELETE, token, &Self::record_path(record), &[], None)
            .await;

        match result {
            Ok(_) => {
                tracing::info!(record_id = %record.record_id, "Cloudflare record deleted");
                Ok(())
            }
            Err(Error::NotFound(_)) => {
                tracing::info!(
                    record_id = %record.record_id,
                    "Cloudflare record already absent, treating as deleted"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
