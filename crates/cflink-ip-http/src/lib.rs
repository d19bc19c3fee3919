// # HTTP IP Source
//
// This crate provides public IP discovery for cflink by asking HTTP echo
// services ("what is my IP") that answer with the caller's address as
// plain text.
//
// ## Failover
//
// Services are asked once each, in the configured order, and the first
// valid answer wins. A service that times out, answers with an error
// status, returns something that is not an IP, or returns an address of
// the wrong version is skipped.
//
// ## Caching
//
// None. Every `current()` call performs a fresh lookup.

use cflink_core::traits::{IpSource, IpVersion};
use cflink_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default lookup timeout per service
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default IP check services, tried in this order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

/// HTTP-based IP source with ordered failover
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// Echo service URLs, in order of preference
    services: Vec<String>,

    /// Only accept addresses of this version
    version: Option<IpVersion>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `services`: URLs to ask, in order (must not be empty)
    /// - `version`: IP version to accept (None = both)
    /// - `timeout`: per-request timeout
    pub fn new(
        services: Vec<String>,
        version: Option<IpVersion>,
        timeout: Duration,
    ) -> Result<Self> {
        if services.is_empty() {
            return Err(Error::config("At least one IP lookup service is required"));
        }

        for url in &services {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "IP lookup service must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            services,
            version,
            client,
        })
    }

    /// Source using the default service list and timeout
    pub fn with_defaults(version: Option<IpVersion>) -> Result<Self> {
        Self::new(
            DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect(),
            version,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Configured services, in lookup order
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Fetch current IP from one service
    async fn fetch_ip(&self, url: &str) -> Result<IpAddr> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::network(format!("{} timed out", url))
            } else {
                Error::network(format!("Request to {} failed: {}", url, e))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{} answered HTTP {}",
                url,
                response.status()
            )));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response from {}: {}", url, e)))?;

        let ip_text = ip_text.trim();

        let ip: IpAddr = ip_text.parse().map_err(|_| {
            Error::network(format!("{} returned an invalid IP address: {:?}", url, ip_text))
        })?;

        if let Some(version) = self.version {
            if !version.matches(&ip) {
                return Err(Error::network(format!(
                    "{} returned {}, expected {:?}",
                    url, ip, version
                )));
            }
        }

        Ok(ip)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let mut last_error = None;

        for url in &self.services {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::debug!(service = %url, %ip, "Public IP resolved");
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!(service = %url, "IP lookup failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.reason())
            .unwrap_or_else(|| "no services configured".to_string());
        Err(Error::network(format!(
            "All IP lookup services failed (last error: {})",
            detail
        )))
    }
}
