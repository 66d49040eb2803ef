//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BotConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => BotConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Empty values are ignored so a blank line in `.env` cannot wipe a file
/// setting.
pub fn apply_env_overrides<F>(config: &mut BotConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("DISCORD_PUBLIC_KEY") {
        config.discord.public_key = v;
    }
    if let Some(v) = get("DISCORD_TOKEN") {
        config.discord.bot_token = v;
    }
    if let Some(v) = get("DISCORD_APPLICATION_ID") {
        config.discord.application_id = v;
    }
    if let Some(v) = get("ADMIN_CHANNEL_ID") {
        config.admin.channel_id = v;
    }
    if let Some(v) = get("ADMIN_USER_ID") {
        config.admin.user_id = v;
    }
    if let Some(v) = get("GOOGLE_SHEETS_ID") {
        config.admin.spreadsheet_id = v;
    }
    if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_EMAIL") {
        config.google.client_email = v;
    }
    if let Some(v) = get("GOOGLE_PRIVATE_KEY") {
        // Keys pasted into env files usually carry literal "\n" sequences.
        config.google.private_key = v.replace("\\n", "\n");
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }
}
