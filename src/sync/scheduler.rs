//! Detached task execution.
//!
//! A sync is accepted synchronously and runs after the response is sent.
//! [`DeferredTaskScheduler`] tracks those tasks so shutdown can wait for
//! them instead of killing them mid-write. [`ManualTaskScheduler`] holds
//! tasks until a test runs them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;

/// A unit of detached work. Failures are handled (logged) inside the task.
pub type DetachedTask = BoxFuture<'static, ()>;

/// Capability to run work after the current request completes.
pub trait TaskScheduler: Send + Sync {
    fn schedule(&self, name: &'static str, task: DetachedTask);
}

/// Production scheduler backed by a tracked `JoinSet`.
#[derive(Default)]
pub struct DeferredTaskScheduler {
    tasks: Mutex<JoinSet<()>>,
}

impl DeferredTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut tasks);
        tasks.len()
    }

    /// Wait up to `budget` for in-flight tasks. Tasks still running after
    /// the budget are aborted. Returns how many were aborted.
    pub async fn drain(&self, budget: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        if tasks.is_empty() {
            return 0;
        }

        tracing::info!(in_flight = tasks.len(), budget = ?budget, "Waiting for background tasks");

        let finished = tokio::time::timeout(budget, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
            }
        })
        .await;

        match finished {
            Ok(()) => 0,
            Err(_) => {
                let aborted = tasks.len();
                tracing::error!(aborted, "Background tasks exceeded shutdown budget, aborting");
                tasks.abort_all();
                aborted
            }
        }
    }
}

impl TaskScheduler for DeferredTaskScheduler {
    fn schedule(&self, name: &'static str, task: DetachedTask) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut tasks);
        tasks.spawn(task);
        tracing::debug!(task = name, in_flight = tasks.len(), "Scheduled background task");
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        log_join_result(result);
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Background task panicked");
        } else {
            tracing::warn!(error = %e, "Background task cancelled");
        }
    }
}

/// Test scheduler: records tasks and runs them when asked.
#[derive(Default)]
pub struct ManualTaskScheduler {
    pending: Mutex<Vec<(&'static str, DetachedTask)>>,
    scheduled: AtomicUsize,
}

impl ManualTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total tasks ever scheduled.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Names of tasks not yet run.
    pub fn pending_names(&self) -> Vec<&'static str> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| *name)
            .collect()
    }

    /// Run every pending task to completion, in scheduling order.
    pub async fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = tasks.len();
        for (_, task) in tasks {
            task.await;
        }
        count
    }
}

impl TaskScheduler for ManualTaskScheduler {
    fn schedule(&self, name: &'static str, task: DetachedTask) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, task));
    }
}
