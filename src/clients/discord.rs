//! Discord REST client for guild member listing.
//!
//! # Responsibilities
//! - Page through `GET /guilds/{id}/members` with the `after` cursor
//! - Honor 429 `retry_after` (global or per-route)
//! - Retry 5xx and network errors with jittered backoff
//! - Bound every page fetch with a deadline

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;

use crate::clients::error::{status_error, UpstreamError};
use crate::config::SyncConfig;
use crate::interactions::types::User;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{classify, RateLimitBody, RetryDecision};
use crate::resilience::with_timeout;
use crate::sync::ports::MemberDirectory;

const SERVICE: &str = "discord";
const USER_AGENT: &str = "DiscordBot (discord-sync-bot, 0.1.0)";

/// A guild member as returned by the member listing endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl GuildMember {
    pub fn is_bot(&self) -> bool {
        self.user.bot.unwrap_or(false)
    }

    /// Nickname, then global display name, then username.
    pub fn display_name(&self) -> &str {
        self.nick
            .as_deref()
            .or(self.user.global_name.as_deref())
            .unwrap_or(&self.user.username)
    }
}

/// Paging and retry knobs.
#[derive(Debug, Clone)]
pub struct DiscordClientSettings {
    pub page_size: u32,
    pub request_timeout: Duration,
    pub max_rate_limit_retries: u32,
    pub max_server_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl DiscordClientSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            page_size: config.page_size,
            request_timeout: Duration::from_secs(config.phase_timeout_secs),
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_server_retries: 3,
            retry_base_delay_ms: config.retry_base_delay_ms,
            retry_max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

/// Discord REST client.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    base_url: String,
    settings: DiscordClientSettings,
}

impl DiscordClient {
    pub fn new(http: Client, base_url: impl Into<String>, settings: DiscordClientSettings) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
        }
    }

    /// Fetch one page of members after `after`.
    async fn fetch_page(
        &self,
        guild_id: &str,
        bot_token: &str,
        after: Option<&str>,
    ) -> Result<Vec<GuildMember>, UpstreamError> {
        let url = format!("{}/guilds/{}/members", self.base_url, guild_id);
        let mut query = vec![("limit", self.settings.page_size.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let mut rate_limit_waits = 0;
        let mut server_retries = 0;

        loop {
            let request = self
                .http
                .get(&url)
                .query(&query)
                .header(header::AUTHORIZATION, format!("Bot {}", bot_token))
                .header(header::USER_AGENT, USER_AGENT)
                .send();

            let attempt = with_timeout(request, self.settings.request_timeout)
                .await
                .map_err(|e| UpstreamError::Timeout {
                    service: SERVICE,
                    message: e.to_string(),
                })?;

            let response = match attempt {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<Vec<GuildMember>>()
                        .await
                        .map_err(|e| UpstreamError::decode(SERVICE, e));
                }
                Ok(response) => response,
                Err(e) => {
                    if server_retries >= self.settings.max_server_retries {
                        return Err(UpstreamError::network(SERVICE, e));
                    }
                    server_retries += 1;
                    let delay = calculate_backoff(
                        server_retries,
                        self.settings.retry_base_delay_ms,
                        self.settings.retry_max_delay_ms,
                    );
                    tracing::warn!(guild_id, attempt = server_retries, delay = ?delay, error = %e, "Discord request failed, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if rate_limit_waits >= self.settings.max_rate_limit_retries {
                    return Err(UpstreamError::RateLimited {
                        service: SERVICE,
                        retries: rate_limit_waits,
                    });
                }
                rate_limit_waits += 1;

                let body = response.json::<RateLimitBody>().await.ok();
                let delay = match classify(Some(status), body.as_ref(), self.settings.request_timeout) {
                    RetryDecision::After(delay) => delay,
                    _ => calculate_backoff(
                        rate_limit_waits,
                        self.settings.retry_base_delay_ms,
                        self.settings.retry_max_delay_ms,
                    ),
                };
                tracing::warn!(
                    guild_id,
                    global = body.as_ref().map(|b| b.global).unwrap_or(false),
                    delay = ?delay,
                    "Discord rate limited member listing"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if classify(Some(status), None, self.settings.request_timeout) == RetryDecision::Backoff
                && server_retries < self.settings.max_server_retries
            {
                server_retries += 1;
                let delay = calculate_backoff(
                    server_retries,
                    self.settings.retry_base_delay_ms,
                    self.settings.retry_max_delay_ms,
                );
                tracing::warn!(guild_id, status = %status, delay = ?delay, "Discord server error, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(status_error(SERVICE, response).await);
        }
    }
}

#[async_trait]
impl MemberDirectory for DiscordClient {
    async fn list_members(
        &self,
        guild_id: &str,
        bot_token: &str,
    ) -> Result<Vec<GuildMember>, UpstreamError> {
        let mut members = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page = self.fetch_page(guild_id, bot_token, after.as_deref()).await?;
            let page_len = page.len();
            after = page.last().map(|m| m.user.id.clone());
            members.extend(page);

            tracing::debug!(guild_id, fetched = members.len(), "Fetched member page");

            if page_len < self.settings.page_size as usize || after.is_none() {
                break;
            }
        }

        Ok(members)
    }
}
