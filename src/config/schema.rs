//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bot.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::DEFAULT_TIMEOUT;

/// Root configuration for the bot.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BotConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Discord application settings.
    pub discord: DiscordConfig,

    /// Privileged command settings.
    pub admin: AdminConfig,

    /// Google service account and Sheets settings.
    pub google: GoogleConfig,

    /// Request verification settings.
    pub security: SecurityConfig,

    /// Background member sync settings.
    pub sync: SyncConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Discord application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Application public key (hex) used to verify interaction signatures.
    pub public_key: String,

    /// Bot token used for REST calls.
    pub bot_token: String,

    /// Application id.
    pub application_id: String,

    /// REST API base URL.
    pub api_base_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            bot_token: String::new(),
            application_id: String::new(),
            api_base_url: "https://discord.com/api/v10".to_string(),
        }
    }
}

/// Settings for the privileged admin commands.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AdminConfig {
    /// The only channel admin commands may be invoked from.
    pub channel_id: String,

    /// The only user allowed to invoke admin commands.
    pub user_id: String,

    /// Target spreadsheet for member sync.
    pub spreadsheet_id: String,
}

impl AdminConfig {
    /// True when every privileged-command setting is present.
    pub fn is_complete(&self) -> bool {
        !self.channel_id.trim().is_empty()
            && !self.user_id.trim().is_empty()
            && !self.spreadsheet_id.trim().is_empty()
    }
}

/// Google service account and Sheets API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Service account email.
    pub client_email: String,

    /// Service account private key (PEM).
    pub private_key: String,

    /// OAuth token endpoint.
    pub token_url: String,

    /// Sheets API base URL.
    pub sheets_base_url: String,

    /// Worksheet that holds the member rows.
    pub sheet_name: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_email: String::new(),
            private_key: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            sheets_base_url: "https://sheets.googleapis.com/v4".to_string(),
            sheet_name: "Members".to_string(),
        }
    }
}

/// Request verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Largest interaction payload accepted by the verifier, in bytes.
    pub max_payload_bytes: usize,
    /// Transport-level body cap in bytes. Must be above `max_payload_bytes`.
    pub max_body_size: usize,
    /// Allowed clock skew between the signature timestamp and now.
    pub timestamp_tolerance_secs: i64,
    /// Deadline for the signature verification call.
    pub verify_timeout_ms: u64,
    /// Per-client rate limit.
    pub rate_limit: RateLimitConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024, // 1 MiB
            max_body_size: 2 * 1024 * 1024, // 2MB
            timestamp_tolerance_secs: 300,
            verify_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Chance that a request triggers an expiry sweep.
    pub sweep_probability: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            sweep_probability: 0.01,
        }
    }
}

/// Background member sync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Hard ceiling on guild size.
    pub max_guild_members: u64,

    /// Members requested per page (Discord allows up to 1000).
    pub page_size: u32,

    /// Rows per Sheets batch update.
    pub write_batch_size: usize,

    /// Deadline for each external call made by the workload.
    pub phase_timeout_secs: u64,

    /// Total budget for one background sync.
    pub background_budget_secs: u64,

    /// How many 429 responses a single page fetch may absorb.
    pub max_rate_limit_retries: u32,

    /// Backoff for 5xx retries.
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_guild_members: 100_000,
            page_size: 1000,
            write_batch_size: 500,
            phase_timeout_secs: 30,
            background_budget_secs: 900,
            max_rate_limit_retries: 5,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 5_000,
        }
    }
}

/// Timeout configuration for the synchronous path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        // Discord drops interactions that are not answered within 3 seconds.
        Self { request_secs: 3 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: BotConfig = toml::from_str(
            r#"
            [admin]
            channel_id = "111"
            "#,
        )
        .unwrap();

        assert_eq!(config.admin.channel_id, "111");
        assert_eq!(config.security.max_payload_bytes, 1024 * 1024);
        assert_eq!(config.security.rate_limit.max_requests, 100);
        assert_eq!(config.sync.max_guild_members, 100_000);
        assert!(!config.admin.is_complete());
    }
}
