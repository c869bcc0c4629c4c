//! tempo-sync - Main entry point
//!
//! Polls Spotify for the current track, resolves its BPM and keeps the LED
//! controller in step until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tempo_common::config::load_config;
use tempo_sync::config::{ConfigOverrides, SyncConfig};
use tempo_sync::TempoSync;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tempo-sync
#[derive(Parser, Debug)]
#[command(name = "tempo-sync")]
#[command(about = "Mirror the playing track's tempo onto an LED controller")]
#[command(version)]
struct Args {
    /// Path to configuration file (overrides TEMPO_SYNC_CONFIG and default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LED controller BPM URL, e.g. http://192.168.0.42/bpm
    #[arg(short, long)]
    device_url: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing exists so its log level can apply
    let (toml_config, config_path) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let level = args
        .log_level
        .unwrap_or_else(|| toml_config.logging.level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tempo_sync={level},tempo_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tempo-sync v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No config file found; using built-in defaults"),
    }

    let overrides = ConfigOverrides {
        device_url: args.device_url,
    };

    let config = match SyncConfig::resolve(toml_config, overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e).context("Invalid configuration");
        }
    };

    info!(
        device = %config.device_url,
        poll_interval = ?config.poll_interval,
        device_sync_interval = ?config.device_sync_interval,
        fallback = ?config.fallback,
        "Configuration resolved"
    );

    let service = TempoSync::build(&config).context("Failed to initialize tempo-sync")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    service.sync_loop.run(cancel).await;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
