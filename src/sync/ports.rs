//! Ports (interfaces) the sync workload depends on.
//!
//! Infrastructure adapters in `crate::clients` implement these; tests use
//! in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::discord::GuildMember;
use crate::clients::error::UpstreamError;
use crate::sync::credentials::ServiceAccountCredentials;

/// One spreadsheet row, column A first.
pub type MemberRow = Vec<String>;

/// Source of guild members.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Every member of the guild, all pages.
    async fn list_members(
        &self,
        guild_id: &str,
        bot_token: &str,
    ) -> Result<Vec<GuildMember>, UpstreamError>;
}

/// Produces an authorized spreadsheet handle.
#[async_trait]
pub trait SpreadsheetConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &ServiceAccountCredentials,
        spreadsheet_id: &str,
    ) -> Result<Arc<dyn SpreadsheetStore>, UpstreamError>;
}

/// Member sheet operations.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Ids already present (first column, below the header row).
    async fn read_member_ids(&self) -> Result<Vec<String>, UpstreamError>;

    /// Write `rows` starting at sheet row `start_row` (1-based).
    async fn write_rows(&self, start_row: usize, rows: &[MemberRow]) -> Result<(), UpstreamError>;
}
