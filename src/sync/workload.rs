//! The detached member sync.
//!
//! Runs after the caller has been told the sync was accepted, so every
//! failure here ends in a log line, never a response.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::clients::discord::GuildMember;
use crate::clients::error::UpstreamError;
use crate::resilience::with_timeout;
use crate::sync::operation::{SyncError, SyncOperation};
use crate::sync::ports::{MemberDirectory, MemberRow, SpreadsheetConnector, SpreadsheetStore};

/// Header row occupies row 1; data starts at row 2.
const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    AcquireSpreadsheetClient,
    ReadExistingIds,
    FetchMembers,
    DiffMembers,
    WriteRows,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::AcquireSpreadsheetClient => "acquire_spreadsheet_client",
            SyncPhase::ReadExistingIds => "read_existing_ids",
            SyncPhase::FetchMembers => "fetch_members",
            SyncPhase::DiffMembers => "diff_members",
            SyncPhase::WriteRows => "write_rows",
        };
        f.write_str(name)
    }
}

/// A sync that stopped in `phase`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sync failed during {phase}: {source}")]
pub struct WorkloadError {
    pub phase: SyncPhase,
    #[source]
    pub source: SyncError,
}

/// Counts logged when a sync completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub existing: usize,
    pub fetched: usize,
    pub bots_skipped: usize,
    pub written: usize,
}

/// Directory + spreadsheet wiring for one sync run.
#[derive(Clone)]
pub struct MemberSyncWorkload {
    directory: Arc<dyn MemberDirectory>,
    connector: Arc<dyn SpreadsheetConnector>,
    phase_timeout: Duration,
    batch_size: usize,
}

impl MemberSyncWorkload {
    pub fn new(
        directory: Arc<dyn MemberDirectory>,
        connector: Arc<dyn SpreadsheetConnector>,
        phase_timeout: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            directory,
            connector,
            phase_timeout,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self, operation: &SyncOperation) -> Result<SyncReport, WorkloadError> {
        let store = self
            .phase(SyncPhase::AcquireSpreadsheetClient, async {
                self.connector
                    .connect(&operation.credentials.service_account, &operation.spreadsheet_id)
                    .await
            })
            .await?;

        let existing = self
            .phase(SyncPhase::ReadExistingIds, store.read_member_ids())
            .await?;

        let members = self
            .phase(SyncPhase::FetchMembers, async {
                self.directory
                    .list_members(&operation.guild_id, &operation.credentials.bot_token)
                    .await
            })
            .await?;

        let synced_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let diff = diff_members(&members, &existing, &synced_at);

        tracing::info!(
            request_id = %operation.request_id,
            existing = existing.len(),
            fetched = members.len(),
            new_rows = diff.rows.len(),
            "Member diff computed"
        );

        let written = self.write_new_rows(store.as_ref(), existing.len(), &diff.rows).await?;

        Ok(SyncReport {
            existing: existing.len(),
            fetched: members.len(),
            bots_skipped: diff.bots_skipped,
            written,
        })
    }

    async fn write_new_rows(
        &self,
        store: &dyn SpreadsheetStore,
        existing: usize,
        rows: &[MemberRow],
    ) -> Result<usize, WorkloadError> {
        let mut next_row = existing + FIRST_DATA_ROW;
        for chunk in rows.chunks(self.batch_size) {
            self.phase(SyncPhase::WriteRows, store.write_rows(next_row, chunk))
                .await?;
            next_row += chunk.len();
        }
        Ok(rows.len())
    }

    async fn phase<T, F>(&self, phase: SyncPhase, fut: F) -> Result<T, WorkloadError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let fail = |source: SyncError| WorkloadError { phase, source };
        with_timeout(fut, self.phase_timeout)
            .await
            .map_err(|e| fail(e.into()))?
            .map_err(|e| fail(e.into()))
    }
}

/// Rows for members not yet in the sheet.
#[derive(Debug, Default, PartialEq)]
pub struct MemberDiff {
    pub rows: Vec<MemberRow>,
    pub bots_skipped: usize,
}

/// Drop bots and already-present ids; duplicates in `members` are written once.
pub fn diff_members(members: &[GuildMember], existing: &[String], synced_at: &str) -> MemberDiff {
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut diff = MemberDiff::default();

    for member in members {
        if member.is_bot() {
            diff.bots_skipped += 1;
            continue;
        }
        if seen.insert(member.user.id.as_str()) {
            diff.rows.push(member_row(member, synced_at));
        }
    }

    diff
}

/// `[id, username, display name, joined at, synced at]`
pub fn member_row(member: &GuildMember, synced_at: &str) -> MemberRow {
    vec![
        member.user.id.clone(),
        member.user.username.clone(),
        member.display_name().to_string(),
        member.joined_at.clone().unwrap_or_default(),
        synced_at.to_string(),
    ]
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::interactions::types::User;
    use crate::sync::credentials::ServiceAccountCredentials;

    pub fn member(id: &str, name: &str, bot: bool) -> GuildMember {
        GuildMember {
            user: User {
                id: id.into(),
                username: name.into(),
                global_name: None,
                bot: Some(bot),
            },
            nick: None,
            joined_at: Some("2024-01-01T00:00:00.000000+00:00".into()),
            roles: Vec::new(),
        }
    }

    #[derive(Default)]
    pub struct FakeDirectory {
        pub members: Vec<GuildMember>,
        pub fail: bool,
    }

    #[async_trait]
    impl MemberDirectory for FakeDirectory {
        async fn list_members(&self, _: &str, _: &str) -> Result<Vec<GuildMember>, UpstreamError> {
            if self.fail {
                return Err(UpstreamError::Status {
                    service: "discord",
                    status: 403,
                    message: "Missing Access".into(),
                });
            }
            Ok(self.members.clone())
        }
    }

    #[derive(Default)]
    pub struct FakeSheet {
        pub existing: Vec<String>,
        pub writes: Mutex<Vec<(usize, Vec<MemberRow>)>>,
    }

    impl FakeSheet {
        pub fn with_ids(ids: &[&str]) -> Self {
            Self {
                existing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn writes(&self) -> Vec<(usize, Vec<MemberRow>)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpreadsheetStore for FakeSheet {
        async fn read_member_ids(&self) -> Result<Vec<String>, UpstreamError> {
            Ok(self.existing.clone())
        }

        async fn write_rows(&self, start_row: usize, rows: &[MemberRow]) -> Result<(), UpstreamError> {
            self.writes.lock().unwrap().push((start_row, rows.to_vec()));
            Ok(())
        }
    }

    pub struct FakeConnector {
        pub sheet: Arc<FakeSheet>,
    }

    #[async_trait]
    impl SpreadsheetConnector for FakeConnector {
        async fn connect(
            &self,
            _: &ServiceAccountCredentials,
            _: &str,
        ) -> Result<Arc<dyn SpreadsheetStore>, UpstreamError> {
            Ok(self.sheet.clone())
        }
    }
}
