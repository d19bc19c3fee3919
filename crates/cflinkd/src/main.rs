// # cflinkd - cflink Daemon
//
// The daemon is a thin integration layer. Reconciliation, lifecycle and
// validation rules live in cflink-core; this binary only:
// 1. Reads configuration from environment variables (see `config.rs`)
// 2. Initializes tracing and the runtime
// 3. Builds the store, provider, IP source and credential cipher
// 4. Serves the HTTP API and runs the periodic IP update scheduler
// 5. Shuts down cleanly on SIGTERM/SIGINT
//
// ## Exit codes
//
// - 0: Clean shutdown
// - 1: Configuration or startup error
// - 2: Runtime error

use anyhow::{Context, Result};
use cflink_core::traits::{DnsProvider, IpSource};
use cflink_core::{FileStore, RecordLocks, Services};
use cflinkd::auth::jwt::JwtConfig;
use cflinkd::{AesGcmCipher, AppState, Config, build_router, scheduler};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long in-flight work may take to drain after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions.
#[derive(Debug, Clone, Copy)]
enum CflinkExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CflinkExitCode> for ExitCode {
    fn from(code: CflinkExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CflinkExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return CflinkExitCode::ConfigError.into();
    }

    // RUST_LOG wins over CFLINK_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CflinkExitCode::ConfigError.into();
    }

    info!("Starting cflinkd {}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Configuration loaded");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CflinkExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let state = match build_state(&config).await {
            Ok(state) => state,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return CflinkExitCode::ConfigError;
            }
        };

        match run_daemon(config, state).await {
            Ok(()) => CflinkExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                CflinkExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the collaborators into shared application state
async fn build_state(config: &Config) -> Result<AppState> {
    let store = Arc::new(
        FileStore::new(&config.data_path)
            .await
            .with_context(|| format!("Failed to open data file {}", config.data_path.display()))?,
    );
    info!(path = %config.data_path.display(), "Record store ready");

    let cipher = AesGcmCipher::new(&config.encryption_key)?;

    let services = Services {
        provider: build_provider(config)?,
        ip_source: build_ip_source(config)?,
        records: store.clone(),
        logs: store.clone(),
        users: store,
        cipher: Arc::new(cipher),
        locks: RecordLocks::default(),
    };

    let jwt = JwtConfig::new(config.secret_key.clone(), config.token_expiry_mins);
    Ok(AppState::new(services, jwt))
}

#[cfg(feature = "cloudflare")]
fn build_provider(config: &Config) -> Result<Arc<dyn DnsProvider>> {
    use cflink_provider_cloudflare::{CLOUDFLARE_API_BASE, CloudflareProvider, DEFAULT_HTTP_TIMEOUT};

    let base = config
        .provider_api_base
        .clone()
        .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string());
    let timeout = config
        .http_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT);

    info!(api_base = %base, "Using Cloudflare provider");
    Ok(Arc::new(CloudflareProvider::new(base, timeout)?))
}

#[cfg(not(feature = "cloudflare"))]
fn build_provider(_config: &Config) -> Result<Arc<dyn DnsProvider>> {
    anyhow::bail!(
        "cflinkd was built without the `cloudflare` feature; no DNS provider is available"
    )
}

#[cfg(feature = "http")]
fn build_ip_source(config: &Config) -> Result<Arc<dyn IpSource>> {
    use cflink_ip_http::{DEFAULT_IP_SERVICES, DEFAULT_TIMEOUT_SECS, HttpIpSource};

    let services = config.ip_services.clone().unwrap_or_else(|| {
        DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect()
    });
    let timeout = Duration::from_secs(config.http_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

    info!(services = ?services, version = ?config.ip_version, "Using HTTP IP lookup");
    Ok(Arc::new(HttpIpSource::new(services, config.ip_version, timeout)?))
}

#[cfg(not(feature = "http"))]
fn build_ip_source(_config: &Config) -> Result<Arc<dyn IpSource>> {
    anyhow::bail!("cflinkd was built without the `http` feature; no IP source is available")
}

/// Serve the API until a shutdown signal arrives
async fn run_daemon(config: Config, state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.update_interval_secs > 0 {
        Some(scheduler::spawn(
            state.reconciler.clone(),
            Duration::from_secs(config.update_interval_secs),
            shutdown_rx.clone(),
        ))
    } else {
        warn!("CFLINK_UPDATE_INTERVAL_SECS=0, periodic IP updates are disabled");
        None
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP API listening");

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });
    let server = tokio::spawn(async move { server.await });

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    let _ = shutdown_tx.send(true);

    let drain = async {
        if let Some(handle) = scheduler
            && let Err(e) = handle.await
        {
            error!("Scheduler task failed: {}", e);
        }
        server.await
    };

    match tokio::time::timeout(SHUTDOWN_GRACE, drain).await {
        Ok(Ok(Ok(()))) => {
            info!("Shutting down daemon");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(anyhow::anyhow!("HTTP server error: {}", e)),
        Ok(Err(e)) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_GRACE)),
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
