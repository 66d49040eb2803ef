//! Startup orchestration.
//!
//! # Responsibilities
//! - Build outbound clients from configuration
//! - Wire security, sync and dispatch into one `AppState`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Collaborators arrive as [`ServiceDeps`] so tests swap in fakes without
//!   touching the wiring

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::clients::{DiscordClient, DiscordClientSettings, GoogleSheetsConnector};
use crate::clock::{Clock, SystemClock};
use crate::config::{BotConfig, ConfigError};
use crate::health::HealthChecks;
use crate::http::AppState;
use crate::interactions::commands::{AdminSyncCommand, PingCommand};
use crate::interactions::InteractionDispatcher;
use crate::security::{
    AuditSink, Ed25519Verifier, InMemoryRateLimitStore, RateLimiter, SecurityOrchestrator,
    SignatureVerifier, TracingAuditSink,
};
use crate::sync::{
    BackgroundSyncOrchestrator, MemberDirectory, MemberSyncWorkload, ServiceAccountCredentials,
    SpreadsheetConnector, SyncCredentials, TaskScheduler,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Collaborators the application is assembled from.
pub struct ServiceDeps {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub directory: Arc<dyn MemberDirectory>,
    pub connector: Arc<dyn SpreadsheetConnector>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditSink>,
}

impl ServiceDeps {
    /// Real Discord, Google and Ed25519 collaborators.
    pub fn production(config: &BotConfig, scheduler: Arc<dyn TaskScheduler>) -> Result<Self, StartupError> {
        let request_timeout = Duration::from_secs(config.sync.phase_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        let directory = DiscordClient::new(
            http.clone(),
            config.discord.api_base_url.clone(),
            DiscordClientSettings::from_config(&config.sync),
        );
        let connector = GoogleSheetsConnector::new(http, config.google.clone(), request_timeout);

        Ok(Self {
            verifier: Arc::new(Ed25519Verifier::new()),
            directory: Arc::new(directory),
            connector: Arc::new(connector),
            scheduler,
            clock: Arc::new(SystemClock),
            audit: Arc::new(TracingAuditSink),
        })
    }
}

/// Assemble the handler state from validated config and collaborators.
pub fn build_app_state(config: &BotConfig, deps: ServiceDeps) -> AppState {
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        deps.clock.clone(),
        &config.security.rate_limit,
    ));

    let security = Arc::new(SecurityOrchestrator::new(
        rate_limiter.clone(),
        deps.verifier,
        deps.clock.clone(),
        &config.security,
    ));

    let workload = MemberSyncWorkload::new(
        deps.directory,
        deps.connector,
        Duration::from_secs(config.sync.phase_timeout_secs),
        config.sync.write_batch_size,
    );
    let orchestrator = Arc::new(BackgroundSyncOrchestrator::new(
        deps.scheduler,
        workload,
        config.sync.max_guild_members,
        Duration::from_secs(config.sync.background_budget_secs),
    ));

    let credentials = SyncCredentials {
        bot_token: config.discord.bot_token.clone(),
        service_account: ServiceAccountCredentials {
            client_email: config.google.client_email.clone(),
            private_key: config.google.private_key.clone(),
        },
    };

    let dispatcher = InteractionDispatcher::new(deps.audit.clone(), deps.clock.clone())
        .with_handler(Arc::new(PingCommand))
        .with_handler(Arc::new(AdminSyncCommand::new(
            config.admin.clone(),
            credentials,
            orchestrator,
            deps.audit.clone(),
            deps.clock.clone(),
        )));

    tracing::info!(commands = ?dispatcher.command_names(), "Command handlers registered");

    AppState {
        security,
        rate_limiter,
        dispatcher: Arc::new(dispatcher),
        audit: deps.audit,
        clock: deps.clock,
        public_key: Arc::from(config.discord.public_key.as_str()),
        health: HealthChecks::from_config(config),
    }
}
