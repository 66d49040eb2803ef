//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Outbound clients → Security → Sync → Dispatcher → AppState
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Finish requests → Drain sync tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Background sync drain has a budget: tasks still running are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_app_state, ServiceDeps, StartupError};
