// # Daemon Configuration
//
// All configuration is done via environment variables:
//
// ### HTTP API
// - `CFLINK_BIND_ADDR`: Listen address (default `127.0.0.1:8000`)
// - `CFLINK_SECRET_KEY`: Signing key for access tokens (required, at least 32 chars)
// - `CFLINK_TOKEN_EXPIRY_MINS`: Access token lifetime (default 10080, one week)
//
// ### Storage
// - `CFLINK_DATA_PATH`: JSON data file (default `./cflink.json`)
// - `CFLINK_ENCRYPTION_KEY`: Key for stored provider tokens (defaults to the secret key)
//
// ### Reconciliation
// - `CFLINK_UPDATE_INTERVAL_SECS`: Scheduler period (default 600, `0` disables it)
// - `CFLINK_IP_SERVICES`: Comma-separated IP lookup URLs (default: built-in list)
// - `CFLINK_IP_VERSION`: `v4`, `v6` or `both` (default `both`)
//
// ### Provider
// - `CFLINK_PROVIDER_API_BASE`: Cloudflare API base URL (default: public API)
// - `CFLINK_HTTP_TIMEOUT_SECS`: Timeout for outbound calls (default: per client)
//
// ### Logging
// - `CFLINK_LOG_LEVEL`: trace, debug, info, warn, error (default `info`); `RUST_LOG` wins
//
// ## Example
//
// ```bash
// export CFLINK_SECRET_KEY=$(openssl rand -hex 32)
// export CFLINK_DATA_PATH=/var/lib/cflink/cflink.json
// export CFLINK_UPDATE_INTERVAL_SECS=300
//
// cflinkd
// ```

use anyhow::{Context, Result};
use cflink_core::IpVersion;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Default data file
pub const DEFAULT_DATA_PATH: &str = "./cflink.json";

/// Default access token lifetime (one week)
pub const DEFAULT_TOKEN_EXPIRY_MINS: i64 = 10_080;

/// Default scheduler period
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 600;

/// Minimum accepted secret key length
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Daemon configuration
#[derive(Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_path: PathBuf,
    pub secret_key: String,
    pub encryption_key: String,
    pub token_expiry_mins: i64,
    /// `0` disables the scheduler
    pub update_interval_secs: u64,
    /// `None` uses the IP source's built-in list
    pub ip_services: Option<Vec<String>>,
    /// `None` accepts both families
    pub ip_version: Option<IpVersion>,
    pub provider_api_base: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("CFLINK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().with_context(|| {
            format!(
                "CFLINK_BIND_ADDR must be a socket address like 127.0.0.1:8000. Got: {}",
                bind_addr
            )
        })?;

        let secret_key = var("CFLINK_SECRET_KEY").unwrap_or_default();
        let encryption_key = var("CFLINK_ENCRYPTION_KEY").unwrap_or_else(|| secret_key.clone());

        Ok(Self {
            bind_addr,
            data_path: var("CFLINK_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            secret_key,
            encryption_key,
            token_expiry_mins: parse_number(&var, "CFLINK_TOKEN_EXPIRY_MINS")?
                .unwrap_or(DEFAULT_TOKEN_EXPIRY_MINS),
            update_interval_secs: parse_number(&var, "CFLINK_UPDATE_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
            ip_services: var("CFLINK_IP_SERVICES").map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            ip_version: parse_ip_version(var("CFLINK_IP_VERSION").as_deref())?,
            provider_api_base: var("CFLINK_PROVIDER_API_BASE"),
            http_timeout_secs: parse_number(&var, "CFLINK_HTTP_TIMEOUT_SECS")?,
            log_level: var("CFLINK_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            anyhow::bail!(
                "CFLINK_SECRET_KEY is required. \
                Set it via: export CFLINK_SECRET_KEY=$(openssl rand -hex 32)"
            );
        }

        if self.secret_key.len() < MIN_SECRET_KEY_LEN {
            anyhow::bail!(
                "CFLINK_SECRET_KEY is too short ({} chars). Use at least {} characters.",
                self.secret_key.len(),
                MIN_SECRET_KEY_LEN
            );
        }

        if self.encryption_key.len() < MIN_SECRET_KEY_LEN {
            anyhow::bail!(
                "CFLINK_ENCRYPTION_KEY is too short ({} chars). Use at least {} characters.",
                self.encryption_key.len(),
                MIN_SECRET_KEY_LEN
            );
        }

        if !(1..=525_600).contains(&self.token_expiry_mins) {
            anyhow::bail!(
                "CFLINK_TOKEN_EXPIRY_MINS must be between 1 and 525600 minutes. Got: {}",
                self.token_expiry_mins
            );
        }

        if self.update_interval_secs != 0 && self.update_interval_secs < 30 {
            anyhow::bail!(
                "CFLINK_UPDATE_INTERVAL_SECS must be 0 (disabled) or at least 30 seconds. Got: {}",
                self.update_interval_secs
            );
        }

        if let Some(ref services) = self.ip_services {
            if services.is_empty() {
                anyhow::bail!("CFLINK_IP_SERVICES is set but contains no URLs");
            }
            for url in services {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    anyhow::bail!(
                        "CFLINK_IP_SERVICES entries must use HTTP or HTTPS. Got: {}",
                        url
                    );
                }
            }
        }

        if let Some(ref base) = self.provider_api_base
            && !base.starts_with("https://")
            && !base.starts_with("http://")
        {
            anyhow::bail!("CFLINK_PROVIDER_API_BASE must use HTTP or HTTPS. Got: {}", base);
        }

        if let Some(timeout) = self.http_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "CFLINK_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        if let Some(parent) = self.data_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "CFLINK_DATA_PATH parent directory does not exist: {}. \
                Create it first: mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CFLINK_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("data_path", &self.data_path)
            .field("secret_key", &"[REDACTED]")
            .field("encryption_key", &"[REDACTED]")
            .field("token_expiry_mins", &self.token_expiry_mins)
            .field("update_interval_secs", &self.update_interval_secs)
            .field("ip_services", &self.ip_services)
            .field("ip_version", &self.ip_version)
            .field("provider_api_base", &self.provider_api_base)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_number<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: {}", key, raw)),
        None => Ok(None),
    }
}

fn parse_ip_version(raw: Option<&str>) -> Result<Option<IpVersion>> {
    match raw.map(str::to_lowercase).as_deref() {
        None | Some("both") => Ok(None),
        Some("v4") | Some("ipv4") => Ok(Some(IpVersion::V4)),
        Some("v6") | Some("ipv6") => Ok(Some(IpVersion::V6)),
        Some(other) => anyhow::bail!(
            "CFLINK_IP_VERSION '{}' is not valid. Valid values: v4, v6, both",
            other
        ),
    }
}
