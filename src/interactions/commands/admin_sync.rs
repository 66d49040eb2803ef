//! `/admin-sync`: copy guild members into the admin spreadsheet.
//!
//! Authorization runs first; only an authorized invocation reaches the sync
//! orchestrator. The reply is sent as soon as the sync is accepted.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::clock::Clock;
use crate::config::AdminConfig;
use crate::interactions::dispatcher::{CommandError, CommandHandler};
use crate::interactions::types::{Interaction, InteractionResponse};
use crate::security::{AuditEventType, AuditLogEntry, AuditSink, SecurityContext};
use crate::sync::{BackgroundSyncOrchestrator, SyncCredentials, SyncOperation};
use crate::validation::{validate_privileged_command, AuthorizedInvocation};

pub const COMMAND_NAME: &str = "admin-sync";

/// Option overriding the interaction's guild.
pub const GUILD_OPTION: &str = "guild_id";
/// Option carrying the caller's member count estimate.
pub const MEMBER_COUNT_OPTION: &str = "member_count";

pub struct AdminSyncCommand {
    admin: AdminConfig,
    credentials: SyncCredentials,
    orchestrator: Arc<BackgroundSyncOrchestrator>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AdminSyncCommand {
    pub fn new(
        admin: AdminConfig,
        credentials: SyncCredentials,
        orchestrator: Arc<BackgroundSyncOrchestrator>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admin,
            credentials,
            orchestrator,
            audit,
            clock,
        }
    }

    fn entry(&self, context: &SecurityContext, interaction: &Interaction, event: AuditEventType, success: bool) -> AuditLogEntry {
        AuditLogEntry::new(context, event, success, self.clock.now_millis())
            .with_command(COMMAND_NAME)
            .with_user(interaction.invoking_user_id())
            .with_location(interaction.guild_id.as_deref(), interaction.channel_id.as_deref())
    }

    fn operation(&self, interaction: &Interaction, authorized: AuthorizedInvocation, context: &SecurityContext) -> SyncOperation {
        let data = interaction.data.as_ref();
        let guild_id = data
            .and_then(|d| d.option_str(GUILD_OPTION))
            .map(str::to_string)
            .or(authorized.guild_id)
            .unwrap_or_default();

        SyncOperation {
            guild_id,
            credentials: self.credentials.clone(),
            request_id: context.request_id.to_string(),
            initiated_by: authorized.user_id,
            timestamp: SyncOperation::format_timestamp(self.clock.now_millis()),
            estimated_member_count: data.and_then(|d| d.option_u64(MEMBER_COUNT_OPTION)),
            spreadsheet_id: authorized.spreadsheet_id,
        }
    }
}

#[async_trait]
impl CommandHandler for AdminSyncCommand {
    fn name(&self) -> &'static str {
        COMMAND_NAME
    }

    async fn handle(
        &self,
        interaction: &Interaction,
        context: &SecurityContext,
    ) -> Result<InteractionResponse, CommandError> {
        let authorized = match validate_privileged_command(interaction, &self.admin) {
            Ok(authorized) => authorized,
            Err(failure) => {
                tracing::warn!(reason = %failure, "Admin command denied");
                self.audit
                    .record(&self.entry(context, interaction, AuditEventType::AdminCommandDenied, false).with_error(failure.to_string()));
                return Ok(InteractionResponse::ephemeral(failure.to_string()));
            }
        };

        let operation = self.operation(interaction, authorized, context);

        match self.orchestrator.accept(operation) {
            Ok(acceptance) => {
                self.audit.record(
                    &self
                        .entry(context, interaction, AuditEventType::SyncAccepted, true)
                        .with_metadata(json!({
                            "requestId": acceptance.request_id,
                            "estimatedDuration": acceptance.estimated_duration,
                        })),
                );
                Ok(InteractionResponse::ephemeral(format!(
                    "Member sync started.\nRequest ID: {}\nEstimated duration: {}",
                    acceptance.request_id, acceptance.estimated_duration
                )))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sync request rejected");
                self.audit
                    .record(&self.entry(context, interaction, AuditEventType::SyncRejected, false).with_error(e.to_string()));
                Ok(InteractionResponse::ephemeral(e.to_string()))
            }
        }
    }
}
