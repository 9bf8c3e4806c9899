// # rddnsd - Router-gated DDNS Daemon
//
// Thin integration layer: all updater logic lives in rddns-core.
//
// The rddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the ICMP probe, HTTP resolver and Cloudflare provider
// 4. Running the updater engine until SIGINT/SIGTERM
//
// ## Configuration
//
// ### Required
// - `ROUTER_IP`: Router host or IPv4 address to ping
// - `CF_API_EMAIL`: Cloudflare account email
// - `CF_API_KEY`: Cloudflare global API key
// - `CF_ZONE_ID`: Cloudflare zone id
// - `CF_RECORDS`: Comma-separated record names, or
// - `DOMAIN_NAME`: Apex domain (manages apex, www and images)
//
// ### Optional
// - `DDNS_CHECK_INTERVAL_SECS`: Seconds between ticks (default 60)
// - `DDNS_PROBE_TIMEOUT_MS`: Ping timeout (default 1000)
// - `DDNS_IP_ECHO_URL`: Public IP service (default https://ifconfig.me/ip)
// - `DDNS_RESOLVE_TIMEOUT_SECS`: Public IP request timeout (default 5)
// - `DDNS_MODE`: `live` or `dry-run`
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ROUTER_IP=192.168.1.1
// export CF_API_EMAIL=admin@example.com
// export CF_API_KEY=your_key
// export CF_ZONE_ID=your_zone
// export DOMAIN_NAME=example.com
//
// rddnsd
// ```

use anyhow::Result;
use rddns_core::{EngineEvent, UpdaterConfig, UpdaterEngine};
use rddns_ip_http::HttpIpResolver;
use rddns_probe_icmp::IcmpProbe;
use rddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable holding the log level
const ENV_LOG_LEVEL: &str = "DDNS_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parse a log level name
fn parse_log_level(value: &str) -> Option<Level> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    // Logging comes first so configuration errors reach the log
    let raw_level = env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string());
    let log_level = match parse_log_level(&raw_level) {
        Some(level) => level,
        None => {
            eprintln!(
                "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                ENV_LOG_LEVEL, raw_level
            );
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let config = match UpdaterConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Starting rddnsd daemon");
    info!(
        "Configuration loaded: router {}, {} record(s), mode {}",
        config.router,
        config.records.len(),
        config.engine.mode
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let engine = match build_engine(config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine).await {
            error!("Daemon error: {}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    })
    .into()
}

/// Wire the concrete components into an engine
fn build_engine(config: UpdaterConfig) -> Result<(UpdaterEngine, mpsc::Receiver<EngineEvent>)> {
    let probe = IcmpProbe::from_config(&config)?;
    let resolver = HttpIpResolver::from_config(&config)?;
    let provider = CloudflareProvider::from_config(&config)?;

    for record in &config.records {
        info!("Managing record: {}", record);
    }

    let parts = UpdaterEngine::new(Box::new(probe), Box::new(resolver), Box::new(provider), config)?;
    Ok(parts)
}

/// Run the engine until a shutdown signal arrives
async fn run_daemon((engine, mut event_rx): (UpdaterEngine, mpsc::Receiver<EngineEvent>)) -> Result<()> {
    let drain = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let signals = shutdown_signals()?;
    engine.run_until(signals).await?;

    drop(engine);
    let _ = drain.await;

    Ok(())
}

/// Install handlers for SIGTERM and SIGINT
///
/// Handlers are registered before the engine starts so an early signal is
/// not lost. The returned future completes on the first signal.
#[cfg(unix)]
fn shutdown_signals() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signals() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: CTRL-C"),
            Err(e) => error!("Failed to wait for CTRL-C: {}", e),
        }
    })
}
