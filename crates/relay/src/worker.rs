//! Alert batch intake: inline processing or a bounded worker pool.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::alert::Alert;
use crate::dispatch::{AlertDispatcher, DispatchReport};

/// Batch could not be accepted.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("alert queue is closed")]
    QueueClosed,
}

/// Where decoded webhook batches go.
#[derive(Clone)]
pub enum AlertSink {
    /// Dispatch in the request handler before responding
    Inline(Arc<AlertDispatcher>),
    /// Hand off to the worker pool
    Queued(mpsc::Sender<Vec<Alert>>),
}

impl AlertSink {
    /// Accept a batch. Inline sinks return the dispatch report.
    ///
    /// A full queue waits for room rather than rejecting the batch.
    pub async fn submit(&self, alerts: Vec<Alert>) -> Result<Option<DispatchReport>, SubmitError> {
        match self {
            Self::Inline(dispatcher) => Ok(Some(dispatcher.dispatch(&alerts).await)),
            Self::Queued(sender) => {
                sender
                    .send(alerts)
                    .await
                    .map_err(|_| SubmitError::QueueClosed)?;
                Ok(None)
            }
        }
    }
}

/// Running worker pool.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks draining a queue of `capacity` batches.
    ///
    /// `workers == 0` yields an inline sink and no tasks. Dropping every
    /// clone of the returned sink stops the workers once the queue drains.
    pub fn spawn(
        dispatcher: Arc<AlertDispatcher>,
        workers: usize,
        capacity: usize,
    ) -> (AlertSink, Self) {
        if workers == 0 {
            info!("Processing alert batches inline");
            return (AlertSink::Inline(dispatcher), Self { handles: Vec::new() });
        }

        let (sender, receiver) = mpsc::channel::<Vec<Alert>>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while waiting for the next batch.
                        let batch = receiver.lock().await.recv().await;
                        let Some(alerts) = batch else {
                            break;
                        };
                        debug!(worker = id, alerts = alerts.len(), "Worker picked up batch");
                        dispatcher.dispatch(&alerts).await;
                    }
                    debug!(worker = id, "Alert worker stopped");
                })
            })
            .collect();

        info!(workers, capacity, "Alert worker pool started");
        (AlertSink::Queued(sender), Self { handles })
    }

    /// Number of worker tasks.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to finish.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
