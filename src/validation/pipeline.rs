//! The three privileged-command validation stages.

use thiserror::Error;

use crate::config::AdminConfig;
use crate::interactions::types::{CommandData, Interaction};

/// Expected reasons a privileged command is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Invalid interaction format")]
    InvalidFormat,
    #[error("Missing required environment configuration")]
    MissingConfiguration,
    #[error("This command can only be used in the designated admin channel")]
    WrongChannel,
    #[error("Insufficient permissions for this admin command")]
    InsufficientPermissions,
}

pub type ValidationResult<T> = Result<T, ValidationFailure>;

/// Output of stage 2: who is asking, from where, against which settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedInvocation<'a> {
    pub user_id: &'a str,
    pub channel_id: Option<&'a str>,
    pub guild_id: Option<&'a str>,
    pub admin: &'a AdminConfig,
}

/// Output of the full chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedInvocation {
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub spreadsheet_id: String,
}

/// Stage 1: identity fields and a command-data block are present.
pub fn validate_interaction_structure(interaction: &Interaction) -> ValidationResult<&CommandData> {
    let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());

    if !present(&interaction.id)
        || interaction.kind.is_none()
        || !present(&interaction.token)
        || interaction.version.is_none()
    {
        return Err(ValidationFailure::InvalidFormat);
    }

    interaction
        .data
        .as_ref()
        .filter(|d| !d.name.is_empty())
        .ok_or(ValidationFailure::InvalidFormat)
}

/// Stage 2: resolve the invoking user and check admin settings exist.
pub fn validate_user_and_environment<'a>(
    interaction: &'a Interaction,
    admin: &'a AdminConfig,
) -> ValidationResult<PrivilegedInvocation<'a>> {
    let user_id = interaction
        .invoking_user_id()
        .ok_or(ValidationFailure::InvalidFormat)?;

    if !admin.is_complete() {
        return Err(ValidationFailure::MissingConfiguration);
    }

    Ok(PrivilegedInvocation {
        user_id,
        channel_id: interaction.channel_id.as_deref(),
        guild_id: interaction.guild_id.as_deref(),
        admin,
    })
}

/// Stage 3: right channel, then right user.
pub fn validate_channel_permissions(
    invocation: PrivilegedInvocation<'_>,
) -> ValidationResult<AuthorizedInvocation> {
    let channel_id = invocation
        .channel_id
        .filter(|c| *c == invocation.admin.channel_id)
        .ok_or(ValidationFailure::WrongChannel)?;

    if invocation.user_id != invocation.admin.user_id {
        return Err(ValidationFailure::InsufficientPermissions);
    }

    Ok(AuthorizedInvocation {
        user_id: invocation.user_id.to_string(),
        channel_id: channel_id.to_string(),
        guild_id: invocation.guild_id.map(str::to_string),
        spreadsheet_id: invocation.admin.spreadsheet_id.clone(),
    })
}

/// Run all three stages, stopping at the first failure.
pub fn validate_privileged_command(
    interaction: &Interaction,
    admin: &AdminConfig,
) -> ValidationResult<AuthorizedInvocation> {
    validate_interaction_structure(interaction)?;
    validate_user_and_environment(interaction, admin).and_then(validate_channel_permissions)
}
