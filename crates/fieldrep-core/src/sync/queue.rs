//! Durable FIFO queue of pending remote operations

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::db::keys::{SYNC_QUEUE, SYNC_QUEUE_UNREADABLE};
use crate::db::{save_json, RecordStore};
use crate::models::{ReportId, SyncOperation, SyncTask, SyncTaskId};
use crate::{Error, Result};

/// Failed attempts after which a task is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Result of one pass over the queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Tasks confirmed by the executor, in execution order
    pub succeeded: Vec<SyncTaskId>,
    /// Failed tasks kept for the next pass, with incremented retry counts
    pub retained: Vec<SyncTask>,
    /// Failed tasks that reached the retry ceiling
    pub dropped: Vec<SyncTask>,
}

impl DrainOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.retained.len() + self.dropped.len()
    }
}

/// Sync queue persisted under the `SyncQueue` key.
///
/// The queue lock is held only while reading or writing the persisted list,
/// never across executor calls, so enqueues proceed during a drain. Entries
/// that no longer parse are moved to `SyncQueueUnreadable` on first read.
pub struct SyncQueue {
    store: Arc<dyn RecordStore>,
    max_retries: u32,
    lock: Mutex<()>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_max_retries(store, DEFAULT_MAX_RETRIES)
    }

    pub fn with_max_retries(store: Arc<dyn RecordStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries: max_retries.max(1),
            lock: Mutex::new(()),
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Append a task for `operation` and persist the queue
    pub async fn enqueue(&self, operation: SyncOperation) -> Result<SyncTaskId> {
        let task = SyncTask::new(operation);
        let id = task.id.clone();

        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        tracing::debug!(
            "Queued {} task {} for report {} ({} pending)",
            task.kind,
            task.id,
            task.report_id(),
            tasks.len() + 1
        );
        tasks.push(task);
        self.save(&tasks).await?;
        Ok(id)
    }

    /// Pending tasks in execution order
    pub async fn pending(&self) -> Result<Vec<SyncTask>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.pending().await?.len())
    }

    /// Whether any pending task targets `report_id`
    pub async fn has_pending(&self, report_id: &ReportId) -> Result<bool> {
        Ok(self
            .pending()
            .await?
            .iter()
            .any(|task| task.report_id() == report_id))
    }

    /// Discard every pending task
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let count = self.load().await?.len();
        self.store.remove(SYNC_QUEUE).await?;
        Ok(count)
    }

    /// Run `executor` over a snapshot of the queue in FIFO order.
    ///
    /// Succeeded tasks are removed. A failed task is retained with its retry
    /// count incremented until the count reaches the ceiling, then dropped.
    /// Tasks enqueued while the pass runs are kept after the retained ones.
    pub async fn drain<F, Fut>(&self, mut executor: F) -> Result<DrainOutcome>
    where
        F: FnMut(SyncTask) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let snapshot = self.pending().await?;
        let mut outcome = DrainOutcome::default();

        for task in &snapshot {
            match executor(task.clone()).await {
                Ok(()) => {
                    tracing::debug!("Sync task {} ({}) succeeded", task.id, task.kind);
                    outcome.succeeded.push(task.id.clone());
                }
                Err(error) => {
                    let mut failed = task.clone();
                    failed.retry_count = failed.retry_count.saturating_add(1);
                    if failed.retry_count >= self.max_retries {
                        tracing::warn!(
                            "Dropping {} task {} for report {} after {} failed attempts: {}",
                            failed.kind,
                            failed.id,
                            failed.report_id(),
                            failed.retry_count,
                            error
                        );
                        outcome.dropped.push(failed);
                    } else {
                        tracing::debug!(
                            "Sync task {} failed (attempt {}/{}): {}",
                            failed.id,
                            failed.retry_count,
                            self.max_retries,
                            error
                        );
                        outcome.retained.push(failed);
                    }
                }
            }
        }

        let snapshot_ids = snapshot
            .iter()
            .map(|task| task.id.clone())
            .collect::<HashSet<_>>();

        let _guard = self.lock.lock().await;
        let current = self.load().await?;
        let mut next = outcome.retained.clone();
        next.extend(
            current
                .into_iter()
                .filter(|task| !snapshot_ids.contains(&task.id)),
        );
        if let Err(error) = self.save(&next).await {
            tracing::error!("Failed to persist sync queue after drain: {}", error);
            return Err(error);
        }

        Ok(outcome)
    }

    async fn load(&self) -> Result<Vec<SyncTask>> {
        let Some(value) = self.store.get(SYNC_QUEUE).await? else {
            return Ok(Vec::new());
        };
        let Value::Array(entries) = value else {
            return Err(Error::Storage(format!(
                "{SYNC_QUEUE} record is not a list"
            )));
        };

        let mut tasks = Vec::with_capacity(entries.len());
        let mut unreadable = Vec::new();
        for entry in entries {
            match serde_json::from_value::<SyncTask>(entry.clone()) {
                Ok(task) => tasks.push(task),
                Err(error) => {
                    tracing::warn!(
                        "Moving unreadable sync task to {}: {}",
                        SYNC_QUEUE_UNREADABLE,
                        error
                    );
                    unreadable.push(entry);
                }
            }
        }

        if !unreadable.is_empty() {
            self.set_aside(unreadable).await?;
            self.save(&tasks).await?;
        }
        Ok(tasks)
    }

    /// Append raw entries to the unreadable record so they survive the next save
    async fn set_aside(&self, entries: Vec<Value>) -> Result<()> {
        let mut kept = self.load_unreadable().await?;
        kept.extend(entries);
        self.store
            .set(SYNC_QUEUE_UNREADABLE, &Value::Array(kept))
            .await
    }

    /// Raw entries set aside because they could not be read as tasks
    pub async fn unreadable(&self) -> Result<Vec<Value>> {
        let _guard = self.lock.lock().await;
        self.load_unreadable().await
    }

    async fn load_unreadable(&self) -> Result<Vec<Value>> {
        Ok(match self.store.get(SYNC_QUEUE_UNREADABLE).await? {
            Some(Value::Array(entries)) => entries,
            Some(other) => vec![other],
            None => Vec::new(),
        })
    }

    async fn save(&self, tasks: &[SyncTask]) -> Result<()> {
        save_json(self.store.as_ref(), SYNC_QUEUE, &tasks).await
    }
}
