//! Task worker
//!
//! The single background consumer of the task queue. For each dequeued id it
//! moves the task to in_progress, loads both sources, filters and normalizes
//! the combined records, then commits them and marks the task completed in one
//! transaction. A source failure marks the task failed with no records.
//!
//! Exactly one worker runs per process, so at most one task is processed at a
//! time and tasks finish in enqueue order.

use evmerge_common::models::{TaskId, TaskStatus};
use evmerge_common::{Error, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::TaskStore;
use crate::pipeline;
use crate::queue::{QueueReceiver, TaskQueue};
use crate::sources::DataLoader;

/// Owns its store and loader handles; nothing is looked up from global state
pub struct Worker {
    store: TaskStore,
    loader: Arc<dyn DataLoader>,
}

impl Worker {
    pub fn new(store: TaskStore, loader: Arc<dyn DataLoader>) -> Self {
        Self { store, loader }
    }

    /// Run the consume loop on its own tokio task
    pub fn spawn(self, receiver: QueueReceiver) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(receiver))
    }

    /// Consume task ids until a stop is requested or every sender is gone.
    ///
    /// A stop takes effect between tasks; the task in flight always finishes.
    ///
    /// # Errors
    /// Returns the first `Error::InvariantViolation`; the loop does not
    /// continue past one.
    pub async fn run(self, mut receiver: QueueReceiver) -> Result<()> {
        info!("Task worker started");

        while let Some(id) = receiver.next().await {
            match self.process(id).await {
                Ok(status) => info!(task_id = id, %status, "Task finished"),
                Err(e @ Error::InvariantViolation(_)) => {
                    error!(task_id = id, error = %e, "Invariant violated, stopping task worker");
                    return Err(e);
                }
                Err(e) => {
                    error!(task_id = id, error = %e, "Task processing failed");
                    self.fail_after_error(id).await;
                }
            }
        }

        if receiver.stop_requested() {
            info!("Task worker stopped on request");
        } else {
            info!("Task queue closed, task worker exiting");
        }
        Ok(())
    }

    /// One processing pass for one task
    pub async fn process(&self, id: TaskId) -> Result<TaskStatus> {
        let task = match self.store.get(id).await {
            Ok(task) => task,
            Err(Error::NotFound(_)) => {
                return Err(Error::InvariantViolation(format!(
                    "dequeued task {} does not exist",
                    id
                )))
            }
            Err(e) => return Err(e),
        };

        // Visible to pollers before any loading starts
        self.store.set_status(id, TaskStatus::InProgress).await?;
        info!(task_id = id, filter = ?task.filter, "Processing task");

        let raw = match self.loader.load().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(task_id = id, error = %e, "Data sources unavailable, failing task");
                self.store.set_status(id, TaskStatus::Failed).await?;
                return Ok(TaskStatus::Failed);
            }
        };

        let outcome = pipeline::merge(&raw, &task.filter);
        info!(
            task_id = id,
            loaded = raw.len(),
            matched = outcome.records.len(),
            filtered_out = outcome.filtered_out,
            dropped = outcome.dropped,
            "Merged data sources"
        );

        self.store.complete(id, &outcome.records).await?;
        Ok(TaskStatus::Completed)
    }

    /// Best effort after a store error.
    ///
    /// Only a task that reached in_progress can move to failed. One still
    /// pending keeps that status and is re-enqueued by the next startup.
    async fn fail_after_error(&self, id: TaskId) {
        let status = match self.store.status(id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(task_id = id, error = %e, "Could not read task status after error");
                return;
            }
        };

        if status.is_terminal() {
            debug!(task_id = id, %status, "Task already terminal after error");
            return;
        }

        if status == TaskStatus::InProgress {
            match self.store.set_status(id, TaskStatus::Failed).await {
                Ok(()) => warn!(task_id = id, "Task marked failed after store error"),
                Err(e) => warn!(task_id = id, error = %e, "Could not mark task failed"),
            }
        } else {
            warn!(task_id = id, "Task left pending; it is re-enqueued on next startup");
        }
    }
}

/// Re-enqueue tasks a previous process accepted but never started.
///
/// Tasks left in_progress by an interrupted pass are reported and left alone;
/// their state machine has no way back to pending.
pub async fn requeue_pending(store: &TaskStore, queue: &TaskQueue) -> Result<usize> {
    let interrupted = store.task_ids_with_status(TaskStatus::InProgress).await?;
    if !interrupted.is_empty() {
        warn!(
            count = interrupted.len(),
            task_ids = ?interrupted,
            "Tasks interrupted by a previous shutdown remain in_progress"
        );
    }

    let pending = store.task_ids_with_status(TaskStatus::Pending).await?;
    for id in &pending {
        queue.enqueue(*id)?;
    }
    if !pending.is_empty() {
        info!(count = pending.len(), "Re-enqueued pending tasks");
    }

    Ok(pending.len())
}
