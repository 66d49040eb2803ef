//! Guild member sync into Google Sheets.
//!
//! # Data Flow
//! ```text
//! admin-sync command
//!     → operation.rs (build + validate SyncOperation)
//!     → orchestrator.rs (accept, assign request id, estimate duration)
//!     → scheduler.rs (detach)
//!         → workload.rs
//!             → ports.rs SpreadsheetConnector (OAuth)
//!             → SpreadsheetStore::read_member_ids
//!             → MemberDirectory::list_members (paged)
//!             → diff, then SpreadsheetStore::write_rows in batches
//! ```
//!
//! Nothing after `accept` returns can reach the caller. Failures are logged
//! with the request id and phase.

pub mod credentials;
pub mod operation;
pub mod orchestrator;
pub mod ports;
pub mod scheduler;
pub mod workload;

pub use credentials::{CredentialsError, ServiceAccountCredentials, SyncCredentials};
pub use operation::{validate_sync_operation, SyncError, SyncOperation};
pub use orchestrator::{BackgroundSyncOrchestrator, SyncAcceptance, SYNC_TASK_NAME};
pub use ports::{MemberDirectory, MemberRow, SpreadsheetConnector, SpreadsheetStore};
pub use scheduler::{DeferredTaskScheduler, ManualTaskScheduler, TaskScheduler};
pub use workload::{MemberSyncWorkload, SyncPhase, SyncReport, WorkloadError};
