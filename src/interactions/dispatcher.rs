//! Interaction dispatch.
//!
//! # Responsibilities
//! - PING → PONG
//! - APPLICATION_COMMAND → registered handler by name
//! - Contain handler errors and panics as an ephemeral error reply
//!
//! # Design Decisions
//! - Handler registry is built once at startup and immutable afterwards
//! - Unknown interaction types are reported back to the HTTP layer, which
//!   owns the status code

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;

use crate::clock::Clock;
use crate::interactions::types::{Interaction, InteractionResponse, InteractionType};
use crate::observability::metrics;
use crate::security::{AuditEventType, AuditLogEntry, AuditSink, SecurityContext};

pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const COMMAND_FAILED: &str = "An error occurred while processing your command";

/// Unexpected failure inside a handler. Expected refusals are replies,
/// not errors.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command failed: {0}")]
    Internal(String),
}

/// A slash command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Name as registered with Discord.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        interaction: &Interaction,
        context: &SecurityContext,
    ) -> Result<InteractionResponse, CommandError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Respond(InteractionResponse),
    /// Type code the dispatcher does not handle (`None` when absent).
    Unsupported(Option<u8>),
}

pub struct InteractionDispatcher {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl InteractionDispatcher {
    pub fn new(audit: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            handlers: HashMap::new(),
            audit,
            clock,
        }
    }

    /// Register a handler. A later handler with the same name replaces the
    /// earlier one.
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.insert(handler.name(), handler);
        self
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(&self, interaction: &Interaction, context: &SecurityContext) -> DispatchOutcome {
        match interaction.interaction_type() {
            Some(InteractionType::Ping) => {
                tracing::debug!("Ping acknowledged");
                DispatchOutcome::Respond(InteractionResponse::pong())
            }
            Some(InteractionType::ApplicationCommand) => {
                DispatchOutcome::Respond(self.run_command(interaction, context).await)
            }
            _ => DispatchOutcome::Unsupported(interaction.kind),
        }
    }

    async fn run_command(&self, interaction: &Interaction, context: &SecurityContext) -> InteractionResponse {
        let name = interaction.command_name().unwrap_or_default();

        let Some(handler) = self.handlers.get(name) else {
            tracing::warn!(command = name, "Unknown command");
            metrics::record_command(name, "unknown");
            return InteractionResponse::ephemeral(UNKNOWN_COMMAND);
        };

        let result = AssertUnwindSafe(handler.handle(interaction, context))
            .catch_unwind()
            .await;

        let (response, error) = match result {
            Ok(Ok(response)) => (response, None),
            Ok(Err(e)) => {
                tracing::error!(command = name, error = %e, "Command handler failed");
                (InteractionResponse::ephemeral(COMMAND_FAILED), Some(e.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(command = name, panic = %message, "Command handler panicked");
                (InteractionResponse::ephemeral(COMMAND_FAILED), Some(message))
            }
        };

        metrics::record_command(name, if error.is_none() { "ok" } else { "error" });

        let mut entry = AuditLogEntry::new(
            context,
            AuditEventType::CommandExecuted,
            error.is_none(),
            self.clock.now_millis(),
        )
        .with_command(name)
        .with_user(interaction.invoking_user_id())
        .with_location(interaction.guild_id.as_deref(), interaction.channel_id.as_deref());
        if let Some(error) = error {
            entry = entry.with_error(error);
        }
        self.audit.record(&entry);

        response
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
