//! Discord member sync bot.
//!
//! Receives Discord slash-command interactions over HTTPS webhooks and syncs
//! guild members into a Google Sheet.
//!
//! # Architecture Overview
//!
//! ```text
//!     Discord ──POST /──▶ http::server
//!                            │
//!                            ▼
//!                   security::SecurityOrchestrator
//!                   (headers → rate limit → size → Ed25519)
//!                            │
//!                            ▼
//!                   interactions::InteractionDispatcher
//!                     ├── ping
//!                     └── admin-sync ──▶ validation::pipeline
//!                                          │
//!                                          ▼
//!                               sync::BackgroundSyncOrchestrator
//!                                 │ accept (sync reply)
//!                                 └─▶ TaskScheduler ──▶ workload
//!                                                        ├─▶ Discord REST
//!                                                        └─▶ Google Sheets
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use discord_sync_bot::config::{load_config, ObservabilityConfig};
use discord_sync_bot::http::HttpServer;
use discord_sync_bot::lifecycle::signals::spawn_signal_listener;
use discord_sync_bot::lifecycle::{build_app_state, ServiceDeps, Shutdown, StartupError};
use discord_sync_bot::observability::{logging, metrics};
use discord_sync_bot::sync::DeferredTaskScheduler;

#[derive(Parser)]
#[command(name = "discord-sync-bot")]
#[command(about = "Discord interactions webhook with background member sync", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to read .env: {}", e);
        }
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Configuration rejected");
            return Err(e.into());
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("discord-sync-bot v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        application_id = %config.discord.application_id,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit = config.security.rate_limit.max_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    let scheduler = Arc::new(DeferredTaskScheduler::new());
    let deps = ServiceDeps::production(&config, scheduler.clone())?;
    let state = build_app_state(&config, deps);

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    tracing::info!(address = ?listener.local_addr().ok(), "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    HttpServer::new(&config, state)
        .run(listener, shutdown.wait())
        .await
        .map_err(StartupError::Serve)?;

    let aborted = scheduler
        .drain(Duration::from_secs(config.sync.background_budget_secs))
        .await;
    if aborted > 0 {
        tracing::warn!(aborted, "Background syncs cut short by shutdown");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
