// # IP Source Trait
//
// Defines the interface for discovering the host's current public IP.
//
// ## Implementations
//
// - HTTP echo services with ordered failover: `cflink-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cflink_core::IpSource;
//
// let ip = source.current().await?;
// println!("public address: {}", ip);
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Whether `ip` is of this version
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

/// Trait for IP source implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Query external echo services
/// - ✅ Try several services in a fixed order within one call
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Cache results across calls
/// - ❌ Spawn background tasks
///
/// # Errors
///
/// `Error::Network` once every configured service has failed.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IP
    async fn current(&self) -> crate::Result<IpAddr>;
}
