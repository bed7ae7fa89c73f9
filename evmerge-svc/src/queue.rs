//! FIFO task queue
//!
//! Entries are task ids, not task objects. Each `create` yields a fresh id
//! and is enqueued exactly once, which keeps processing at most once per task.
//!
//! Stopping is a separate signal rather than a queue entry: a stop request
//! overtakes every id still waiting, and those tasks stay pending in the
//! store until the next startup re-enqueues them.

use evmerge_common::models::TaskId;
use evmerge_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Sending end, cloned into every request handler
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<TaskId>,
    stop: Arc<watch::Sender<bool>>,
}

/// Receiving end, owned by the single worker
#[derive(Debug)]
pub struct QueueReceiver {
    tasks: mpsc::UnboundedReceiver<TaskId>,
    stop: watch::Receiver<bool>,
}

impl TaskQueue {
    /// Create the queue and the receiver the worker drains
    pub fn new() -> (Self, QueueReceiver) {
        let (sender, tasks) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        (
            Self {
                sender,
                stop: Arc::new(stop_tx),
            },
            QueueReceiver {
                tasks,
                stop: stop_rx,
            },
        )
    }

    /// Push a task id; never blocks
    pub fn enqueue(&self, id: TaskId) -> Result<()> {
        self.sender
            .send(id)
            .map_err(|_| Error::Internal("task worker is not running".to_string()))
    }

    /// Ask the worker to stop once the task it is currently processing is done.
    ///
    /// Ids still queued are not handed out.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }
}

impl QueueReceiver {
    /// Wait for the next task id.
    ///
    /// Returns `None` once a stop has been requested, even with ids still
    /// queued. When every `TaskQueue` handle is gone the remaining ids are
    /// handed out before `None`.
    pub async fn next(&mut self) -> Option<TaskId> {
        let stopped = *self.stop.borrow();
        if stopped {
            return None;
        }

        tokio::select! {
            biased;
            changed = self.stop.changed() => match changed {
                Ok(()) => None,
                // Stop sender dropped along with the last queue handle
                Err(_) => self.tasks.recv().await,
            },
            id = self.tasks.recv() => id,
        }
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }
}
