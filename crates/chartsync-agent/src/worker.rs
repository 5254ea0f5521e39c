//! Single-owner sync worker.
//!
//! One task owns the [`CollectionSynchronizer`]; every producer talks to it
//! through a [`SyncHandle`]. Batches are applied one at a time in the order
//! they reach the queue, so concurrent deliveries never interleave.

use chartsync_core::{BatchReport, ChangeEvent, CollectionSynchronizer, Record, Renderer};
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command<R> {
    Apply {
        events: Vec<ChangeEvent<R>>,
        reply: oneshot::Sender<Result<BatchReport, WorkerError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<R>>,
    },
}

/// Handle for submitting batches to a running worker.
pub struct SyncHandle<R> {
    tx: mpsc::Sender<Command<R>>,
}

impl<R> Clone for SyncHandle<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> SyncHandle<R> {
    /// Apply a batch and wait for its report.
    ///
    /// # Errors
    ///
    /// Returns error if the worker stopped or the renderer failed. After a
    /// render failure the batch is still applied.
    pub async fn submit(&self, events: Vec<ChangeEvent<R>>) -> Result<BatchReport, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Apply { events, reply })
            .await
            .map_err(|_| WorkerError::Closed)?;
        rx.await.map_err(|_| WorkerError::Closed)?
    }

    /// Copy of the current contents, taken between batches.
    ///
    /// # Errors
    ///
    /// Returns error if the worker stopped.
    pub async fn snapshot(&self) -> Result<Vec<R>, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| WorkerError::Closed)?;
        rx.await.map_err(|_| WorkerError::Closed)
    }
}

/// Spawns the task that owns a synchronizer.
pub struct SyncWorker;

impl SyncWorker {
    /// Move `sync` into a new task.
    ///
    /// The task ends once every handle is dropped and returns the
    /// synchronizer with its final state.
    pub fn spawn<R, F>(
        sync: CollectionSynchronizer<R, F>,
        capacity: usize,
    ) -> (SyncHandle<R>, JoinHandle<CollectionSynchronizer<R, F>>)
    where
        R: Record + Send + 'static,
        F: Renderer<R> + Send + 'static,
        F::Error: Display,
    {
        let (tx, mut rx) = mpsc::channel::<Command<R>>(capacity.max(1));

        let task = tokio::spawn(async move {
            let mut sync = sync;
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Apply { events, reply } => {
                        let result = sync.apply_batch(events).map_err(|e| {
                            tracing::warn!(collection = %sync.name(), error = %e, "Render failed");
                            WorkerError::Render(e.to_string())
                        });
                        if reply.send(result).is_err() {
                            tracing::debug!(collection = %sync.name(), "Submitter went away");
                        }
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(sync.to_snapshot());
                    }
                }
            }
            tracing::debug!(collection = %sync.name(), len = sync.len(), "Sync worker stopped");
            sync
        });

        (SyncHandle { tx }, task)
    }
}

/// Errors returned through a [`SyncHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker task is gone
    #[error("sync worker stopped")]
    Closed,
    /// The batch was applied but rendering failed
    #[error("render failed: {0}")]
    Render(String),
}
