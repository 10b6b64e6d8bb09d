use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tollgate::config::{LogFormat, LoggingConfig, TollgateConfig};
use tollgate::http::HttpServer;
use tollgate::ratelimit::{ClientRegistry, MonoClock, RateLimiter, Reclaimer};

/// Per-client token bucket rate limiting in front of an HTTP endpoint.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TollgateConfig::load(cli.config.as_deref())?;
    if let Some(addr) = cli.listen {
        config.server.http_addr = addr;
    }

    init_tracing(&config.logging);

    info!("Starting Tollgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        http_addr = %config.server.http_addr,
        scope = ?config.rate_limiting.scope,
        capacity = config.rate_limiting.capacity,
        refill_rate = config.rate_limiting.refill_rate_per_second,
        "Configuration loaded"
    );

    let registry = Arc::new(ClientRegistry::new(
        config.rate_limiting.bucket()?,
        Arc::new(MonoClock),
    ));
    let rate_limiter = RateLimiter::new(registry.clone(), config.rate_limiting.scope);

    let cancel = CancellationToken::new();
    let reclaimer = Reclaimer::new(
        registry,
        config.rate_limiting.reclaim_interval(),
        config.rate_limiting.idle_threshold(),
    )
    .spawn(cancel.clone());
    info!("Reclaimer started");

    let server = HttpServer::bind(config.server.http_addr, rate_limiter).await?;
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    cancel.cancel();
    if let Err(e) = reclaimer.await {
        error!(error = %e, "Reclaimer terminated abnormally");
    }

    served?;
    info!("Tollgate stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
