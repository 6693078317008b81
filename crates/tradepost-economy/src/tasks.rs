//! Background task ledger.
//!
//! Side effects of a committed trade (experience, quest progress) run as
//! detached tokio tasks. The ledger counts them so shutdown can wait for the
//! count to drain, and gives up after a deadline without cancelling
//! anything.
//!
//! # Architecture
//!
//! The counter is an [`AtomicUsize`]; a [`Notify`] wakes shutdown waiters when
//! it hits zero. Each task owns a guard that decrements on drop, so the count
//! stays correct even if a task panics.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::EconomyError;

/// Tracks in-flight background tasks.
#[derive(Debug, Default)]
pub struct TaskLedger {
    /// Tasks spawned and not yet finished.
    outstanding: AtomicUsize,

    /// Signalled whenever `outstanding` drops to zero.
    drained: Notify,
}

impl TaskLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still running.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Run `task` in the background and count it until it finishes.
    ///
    /// The task is detached from the caller: dropping the caller's future
    /// does not cancel it.
    pub fn spawn<F>(self: &Arc<Self>, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = TaskGuard {
            ledger: Arc::clone(self),
            label,
        };
        tracing::debug!(task = label, "Background task spawned");
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Wait until no tasks are outstanding.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a drain between the check and the
            // await is not missed.
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait for outstanding tasks, giving up after `deadline`.
    ///
    /// Tasks still running at the deadline keep running and are still
    /// counted when they finish.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::ShutdownTimedOut`] if the deadline elapses
    /// first.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), EconomyError> {
        tracing::info!(
            outstanding = self.outstanding(),
            deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            "Waiting for background tasks"
        );
        if tokio::time::timeout(deadline, self.wait_idle()).await.is_ok() {
            tracing::info!("Background tasks drained");
            Ok(())
        } else {
            let outstanding = self.outstanding();
            tracing::warn!(outstanding, "Shutdown deadline elapsed");
            Err(EconomyError::ShutdownTimedOut { outstanding })
        }
    }
}

/// Decrements the ledger when its task ends, however it ends.
struct TaskGuard {
    ledger: Arc<TaskLedger>,
    label: &'static str,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let previous = self.ledger.outstanding.fetch_sub(1, Ordering::AcqRel);
        tracing::debug!(task = self.label, "Background task finished");
        if previous == 1 {
            self.ledger.drained.notify_waiters();
        }
    }
}
