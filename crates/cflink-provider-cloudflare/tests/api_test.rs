// Integration tests for `CloudflareProvider` using wiremock.

use std::time::Duration;

use cflink_core::traits::{ApiToken, DnsProvider, ProviderRecordRef, RecordSpec};
use cflink_core::{Error, RecordType, Ttl};
use cflink_provider_cloudflare::CloudflareProvider;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudflareProvider, ApiToken) {
    let server = MockServer::start().await;
    let provider = CloudflareProvider::new(server.uri(), Duration::from_millis(500)).unwrap();
    (server, provider, ApiToken::new("cf-test-token"))
}

fn target() -> ProviderRecordRef {
    ProviderRecordRef {
        zone_id: "zone-1".to_string(),
        record_id: "rec-1".to_string(),
    }
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    }))
}

// ── Zones ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_zones_sends_bearer_token_and_parses_result() {
    let (server, provider, token) = setup().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(header("authorization", "Bearer cf-test-token"))
        .respond_with(ok(json!([
            { "id": "zone-1", "name": "example.com", "status": "active", "paused": false, "type": "full" },
            { "id": "zone-2", "name": "example.org", "status": "pending", "paused": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let zones = provider.list_zones(&token).await.unwrap();

    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].id, "zone-1");
    assert_eq!(zones[1].status, "pending");
    assert!(zones[1].paused);
}

#[tokio::test]
async fn list_zones_follows_pagination() {
    let (server, provider, token) = setup().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "id": "zone-1", "name": "a.com", "status": "active" }],
            "result_info": { "page": 1, "total_pages": 2 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "id": "zone-2", "name": "b.com", "status": "active" }],
            "result_info": { "page": 2, "total_pages": 2 }
        })))
        .mount(&server)
        .await;

    let zones = provider.list_zones(&token).await.unwrap();

    let ids: Vec<_> = zones.iter().map(|z| z.id.as_str()).collect();
    assert_eq!(ids, vec!["zone-1", "zone-2"]);
}

#[tokio::test]
async fn invalid_token_is_a_provider_error() {
    let (server, provider, token) = setup().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 9109, "message": "Invalid access token" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let result = provider.list_zones(&token).await;

    assert!(
        matches!(result, Err(Error::Provider { .. })),
        "expected Provider error, got: {result:?}"
    );
}

// ── Records ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_record_posts_spec_and_returns_id() {
    let (server, provider, token) = setup().await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .and(body_json(json!({
            "type": "MX",
            "name": "example.com",
            "content": "mail.example.com",
            "ttl": 3600,
            "proxied": false,
            "priority": 10
        })))
        .respond_with(ok(json!({ "id": "rec-42", "type": "MX" })))
        .expect(1)
        .mount(&server)
        .await;

    let spec = RecordSpec {
        zone_id: "zone-1".to_string(),
        record_type: RecordType::Mx,
        name: "example.com".to_string(),
        content: "mail.example.com".to_string(),
        ttl: Ttl::Seconds(3600),
        proxied: false,
        priority: Some(10),
    };

    let id = provider.create_record(&token, &spec).await.unwrap();
    assert_eq!(id, "rec-42");
}

#[tokio::test]
async fn create_rejection_carries_cloudflare_reason() {
    let (server, provider, token) = setup().await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 81057, "message": "Record already exists." }],
            "result": null
        })))
        .mount(&server)
        .await;

    let spec = RecordSpec {
        zone_id: "zone-1".to_string(),
        record_type: RecordType::A,
        name: "home.example.com".to_string(),
        content: "1.2.3.4".to_string(),
        ttl: Ttl::Auto,
        proxied: true,
        priority: None,
    };

    let err = provider.create_record(&token, &spec).await.unwrap_err();
    assert!(err.reason().contains("Record already exists."));
}

#[tokio::test]
async fn content_update_patches_only_content() {
    let (server, provider, token) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .and(body_json(json!({ "content": "5.6.7.8" })))
        .respond_with(ok(json!({ "id": "rec-1", "content": "5.6.7.8" })))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .update_record_content(&token, &target(), "5.6.7.8")
        .await
        .unwrap();
}

#[tokio::test]
async fn full_update_puts_record() {
    let (server, provider, token) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ok(json!({ "id": "rec-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let spec = RecordSpec {
        zone_id: "zone-1".to_string(),
        record_type: RecordType::Txt,
        name: "txt.example.com".to_string(),
        content: "hello".to_string(),
        ttl: Ttl::Auto,
        proxied: false,
        priority: None,
    };

    provider.update_record(&token, &target(), &spec).await.unwrap();
}

#[tokio::test]
async fn delete_of_absent_record_succeeds() {
    let (server, provider, token) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 81044, "message": "Record does not exist." }],
            "result": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    provider.delete_record(&token, &target()).await.unwrap();
}

#[tokio::test]
async fn delete_rejection_mentioning_not_found_is_surfaced() {
    let (server, provider, token) = setup().await;

    // 400 whose message happens to read like a 404
    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 0, "message": "Not found in allowed record set" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider.delete_record(&token, &target()).await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }), "got: {err:?}");
    assert_eq!(err.reason(), "Not found in allowed record set");
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let (server, provider, token) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 81044, "message": "Record does not exist." }],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider
        .update_record_content(&token, &target(), "5.6.7.8")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got: {err:?}");
    assert_eq!(err.reason(), "Cloudflare: Record does not exist. (code 81044)");
}

#[tokio::test]
async fn delete_server_error_is_surfaced() {
    let (server, provider, token) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = provider.delete_record(&token, &target()).await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
}

#[tokio::test]
async fn slow_api_is_a_network_error() {
    let (server, provider, token) = setup().await;

    Mock::given(method("PATCH"))
        .respond_with(ok(json!({})).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = provider
        .update_record_content(&token, &target(), "5.6.7.8")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got: {err:?}");
}

#[tokio::test]
async fn list_records_parses_provider_view() {
    let (server, provider, token) = setup().await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ok(json!([
            { "id": "rec-1", "type": "A", "name": "home.example.com", "content": "1.2.3.4", "ttl": 1, "proxied": true },
            { "id": "rec-2", "type": "SRV", "name": "_sip._tcp.example.com", "content": "0 5 5060 sip.example.com", "ttl": 300 }
        ])))
        .mount(&server)
        .await;

    let records = provider.list_records(&token, "zone-1").await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].record_type, "A");
    assert!(records[0].proxied);
    assert_eq!(records[1].record_type, "SRV");
}
