//! Accept-then-detach sync orchestration.
//!
//! `accept` validates synchronously and either rejects or returns an
//! acceptance. On acceptance the workload is handed to the scheduler exactly
//! once; its outcome is only ever logged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use crate::observability::metrics;
use crate::resilience::with_timeout;
use crate::sync::operation::{
    estimate_duration, resolve_request_id, validate_sync_operation, SyncError, SyncOperation,
};
use crate::sync::scheduler::TaskScheduler;
use crate::sync::workload::MemberSyncWorkload;

pub const SYNC_TASK_NAME: &str = "member_sync";

/// Returned to the caller before any sync work runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAcceptance {
    pub request_id: String,
    pub estimated_duration: &'static str,
    pub metadata: serde_json::Value,
}

pub struct BackgroundSyncOrchestrator {
    scheduler: Arc<dyn TaskScheduler>,
    workload: MemberSyncWorkload,
    max_guild_members: u64,
    background_budget: Duration,
}

impl BackgroundSyncOrchestrator {
    pub fn new(
        scheduler: Arc<dyn TaskScheduler>,
        workload: MemberSyncWorkload,
        max_guild_members: u64,
        background_budget: Duration,
    ) -> Self {
        Self {
            scheduler,
            workload,
            max_guild_members,
            background_budget,
        }
    }

    /// Validate `operation` and, if it passes, schedule the sync.
    pub fn accept(&self, operation: SyncOperation) -> Result<SyncAcceptance, SyncError> {
        validate_sync_operation(&operation, self.max_guild_members)?;

        let operation = SyncOperation {
            request_id: resolve_request_id(&operation.request_id),
            ..operation
        };

        let acceptance = SyncAcceptance {
            request_id: operation.request_id.clone(),
            estimated_duration: estimate_duration(operation.estimated_member_count),
            metadata: json!({
                "guildId": operation.guild_id,
                "initiatedBy": operation.initiated_by,
                "timestamp": operation.timestamp,
                "estimatedMemberCount": operation.estimated_member_count,
            }),
        };

        metrics::record_sync("accepted");
        tracing::info!(
            request_id = %acceptance.request_id,
            guild_id = %operation.guild_id,
            initiated_by = %operation.initiated_by,
            estimated_duration = acceptance.estimated_duration,
            "Sync accepted"
        );

        let workload = self.workload.clone();
        let budget = self.background_budget;
        self.scheduler.schedule(
            SYNC_TASK_NAME,
            Box::pin(async move { run_detached(workload, operation, budget).await }),
        );

        Ok(acceptance)
    }
}

async fn run_detached(workload: MemberSyncWorkload, operation: SyncOperation, budget: Duration) {
    let started = Instant::now();
    tracing::info!(request_id = %operation.request_id, guild_id = %operation.guild_id, "Sync started");

    match with_timeout(workload.run(&operation), budget).await {
        Ok(Ok(report)) => {
            metrics::record_sync("succeeded");
            tracing::info!(
                request_id = %operation.request_id,
                existing = report.existing,
                fetched = report.fetched,
                bots_skipped = report.bots_skipped,
                written = report.written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Sync completed"
            );
        }
        Ok(Err(e)) => {
            metrics::record_sync("failed");
            tracing::error!(
                request_id = %operation.request_id,
                phase = %e.phase,
                error = %e.source,
                "Sync failed"
            );
        }
        Err(e) => {
            metrics::record_sync("failed");
            tracing::error!(
                request_id = %operation.request_id,
                error = %e,
                "Sync exceeded its time budget"
            );
        }
    }
}
