use async_trait::async_trait;

use crate::interactions::dispatcher::{CommandError, CommandHandler};
use crate::interactions::types::{Interaction, InteractionResponse};
use crate::security::SecurityContext;

/// `/ping`: confirms the command path end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn handle(&self, _: &Interaction, _: &SecurityContext) -> Result<InteractionResponse, CommandError> {
        Ok(InteractionResponse::ephemeral("Pong!"))
    }
}
