//! Sync engine: drains the queue against the remote store

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use super::queue::{DrainOutcome, SyncQueue};
use crate::db::ReportRepository;
use crate::models::{ReportDocument, SyncOperation, SyncTask, Uid};
use crate::remote::RemoteStore;
use crate::session::SessionContext;
use crate::state::SyncState;
use crate::{Error, Result};

/// Executes queued operations against the remote store.
///
/// At most one drain runs at a time; a trigger that arrives while a drain is
/// in flight is coalesced into a no-op.
pub struct SyncEngine {
    queue: Arc<SyncQueue>,
    reports: ReportRepository,
    remote: Arc<dyn RemoteStore>,
    session: SessionContext,
    draining: AtomicBool,
    state: watch::Sender<SyncState>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<SyncQueue>,
        reports: ReportRepository,
        remote: Arc<dyn RemoteStore>,
        session: SessionContext,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            queue,
            reports,
            remote,
            session,
            draining: AtomicBool::new(false),
            state,
        }
    }

    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Record that the network is unreachable
    pub fn mark_offline(&self) {
        if !self.is_draining() {
            self.publish(SyncState::Offline);
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.queue.pending_count().await
    }

    /// Drain the queue once.
    ///
    /// Returns `None` when another drain was already in flight.
    pub async fn process_sync_queue(&self) -> Result<Option<DrainOutcome>> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("Sync already in progress; coalescing trigger");
            return Ok(None);
        };

        if self.queue.pending_count().await? == 0 {
            self.publish(SyncState::Synced);
            return Ok(Some(DrainOutcome::default()));
        }

        self.publish(SyncState::Syncing);
        let uid = self.session.uid();
        if uid.is_guest() {
            tracing::warn!("No signed-in user; queued sync tasks will fail");
        }

        let result = self
            .queue
            .drain(|task| self.execute_task(&uid, task))
            .await;

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Sync pass finished: {} succeeded, {} retained, {} dropped",
                    outcome.succeeded.len(),
                    outcome.retained.len(),
                    outcome.dropped.len()
                );
                // Dropped tasks leave local changes the remote never saw
                self.publish(if outcome.retained.is_empty() && outcome.dropped.is_empty() {
                    SyncState::Synced
                } else {
                    SyncState::Error
                });
                Ok(Some(outcome))
            }
            Err(error) => {
                tracing::error!("Sync pass aborted: {}", error);
                self.publish(SyncState::Error);
                Err(error)
            }
        }
    }

    /// Queue a `create` for every unsynced local report without a pending task.
    ///
    /// Recovers reports whose tasks were dropped at the retry ceiling.
    pub async fn requeue_unsynced(&self) -> Result<usize> {
        let uid = self.session.uid();
        if uid.is_guest() {
            return Ok(0);
        }

        let pending = self
            .queue
            .pending()
            .await?
            .into_iter()
            .map(|task| task.data.report_id)
            .collect::<HashSet<_>>();

        let mut queued = 0;
        for report in self.reports.list_unsynced(&uid).await? {
            if pending.contains(&report.id) {
                continue;
            }
            self.queue
                .enqueue(SyncOperation::Create {
                    report_id: report.id.clone(),
                    document: ReportDocument::from(&report),
                })
                .await?;
            queued += 1;
        }

        if queued > 0 {
            tracing::info!("Requeued {} unsynced report(s)", queued);
        }
        Ok(queued)
    }

    /// Delete remote documents whose reports no longer exist locally
    pub async fn reconcile_remote_deletions(&self) -> Result<usize> {
        let uid = self.session.uid();
        let sync_uid = uid.sync_uid().ok_or(Error::NoSession)?;

        let remote_documents = self.remote.list_documents(sync_uid).await?;
        let local_ids = self
            .reports
            .list_reports(&uid)
            .await?
            .into_iter()
            .map(|report| report.id)
            .collect::<HashSet<_>>();

        let mut deleted = 0;
        for document in remote_documents {
            if local_ids.contains(&document.id) {
                continue;
            }
            self.remote.delete_document(sync_uid, &document.id).await?;
            tracing::debug!("Deleted orphaned remote document {}", document.id);
            deleted += 1;
        }

        if deleted > 0 {
            tracing::info!("Removed {} remote document(s) deleted locally", deleted);
        }
        Ok(deleted)
    }

    /// Apply one operation for a signed-in user and record its confirmation
    pub(crate) async fn execute(&self, uid: &Uid, operation: &SyncOperation) -> Result<()> {
        let sync_uid = uid.sync_uid().ok_or(Error::NoSession)?;
        apply_operation(self.remote.as_ref(), sync_uid, operation).await?;

        if let Some(written_at) = operation.written_version() {
            match self
                .reports
                .mark_synced(uid, operation.report_id(), written_at)
                .await
            {
                Ok(_) | Err(Error::NotFound(_)) => {}
                Err(error) => tracing::error!(
                    "Report {} synced but not marked locally: {}",
                    operation.report_id(),
                    error
                ),
            }
        }
        Ok(())
    }

    async fn execute_task(&self, uid: &Uid, task: SyncTask) -> Result<()> {
        let operation = task.operation()?;
        self.execute(uid, &operation).await
    }

    fn publish(&self, state: SyncState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

/// Dispatch an operation to the remote store, stamping `syncedAt`
pub(crate) async fn apply_operation(
    remote: &dyn RemoteStore,
    uid: &str,
    operation: &SyncOperation,
) -> Result<()> {
    match operation {
        SyncOperation::Create {
            report_id,
            document,
        } => {
            let mut document = document.clone();
            document.synced_at = Some(Utc::now());
            remote.set_document(uid, report_id, &document).await
        }
        SyncOperation::Update { report_id, patch } => {
            let mut patch = patch.clone();
            patch.synced_at = Some(Utc::now());
            remote.update_document(uid, report_id, &patch).await
        }
        SyncOperation::Delete { report_id } => remote.delete_document(uid, report_id).await,
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
