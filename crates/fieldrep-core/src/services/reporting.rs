//! Report workflows: local write first, then the sync side effect

use std::sync::Arc;

use crate::connectivity::Connectivity;
use crate::db::{DraftRepository, ReportRepository};
use crate::models::{
    DraftId, Report, ReportDocument, ReportDocumentPatch, ReportFields, ReportId, ReportPatch,
    SyncOperation, SyncTaskId, Uid,
};
use crate::session::SessionContext;
use crate::sync::SyncEngine;
use crate::{Error, Result};

/// How a local change reached (or will reach) the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Confirmed by the remote store inline
    Synced,
    /// Queued for the next drain
    Queued { task_id: SyncTaskId, pending: usize },
    /// Guest data, never synced
    LocalOnly,
}

impl SyncOutcome {
    /// Short status line for collaborators
    pub fn describe(&self) -> String {
        match self {
            Self::Synced => "synced".to_string(),
            Self::Queued { pending, .. } => format!("will sync ({pending} pending)"),
            Self::LocalOnly => "saved on this device only".to_string(),
        }
    }
}

/// Publish, edit, and delete reports for the current session
#[derive(Clone)]
pub struct ReportService {
    reports: ReportRepository,
    drafts: DraftRepository,
    engine: Arc<SyncEngine>,
    connectivity: Connectivity,
    session: SessionContext,
}

impl ReportService {
    pub fn new(
        reports: ReportRepository,
        drafts: DraftRepository,
        engine: Arc<SyncEngine>,
        connectivity: Connectivity,
        session: SessionContext,
    ) -> Self {
        Self {
            reports,
            drafts,
            engine,
            connectivity,
            session,
        }
    }

    pub const fn reports(&self) -> &ReportRepository {
        &self.reports
    }

    pub const fn drafts(&self) -> &DraftRepository {
        &self.drafts
    }

    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Current user's reports, newest first
    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        self.reports.list_reports(&self.session.uid()).await
    }

    pub async fn get_report(&self, id: &ReportId) -> Result<Option<Report>> {
        self.reports.get_report(&self.session.uid(), id).await
    }

    /// Save a new report and propagate it
    pub async fn publish_report(&self, fields: ReportFields) -> Result<(Report, SyncOutcome)> {
        let uid = self.session.uid();
        let report = self.reports.create_report(&uid, fields).await?;
        let outcome = self
            .propagate(
                &uid,
                SyncOperation::Create {
                    report_id: report.id.clone(),
                    document: ReportDocument::from(&report),
                },
            )
            .await?;
        Ok((self.refreshed(&uid, report).await, outcome))
    }

    /// Apply an edit and propagate the changed fields
    pub async fn edit_report(
        &self,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<(Report, SyncOutcome)> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("no changes to apply".to_string()));
        }

        let uid = self.session.uid();
        let report = self.reports.update_report(&uid, id, patch).await?;
        let outcome = self
            .propagate(
                &uid,
                SyncOperation::Update {
                    report_id: report.id.clone(),
                    patch: ReportDocumentPatch::from_edit(patch, &report),
                },
            )
            .await?;
        Ok((self.refreshed(&uid, report).await, outcome))
    }

    /// Delete a report locally and remotely.
    ///
    /// A report that is already gone locally counts as deleted; the remote
    /// delete is still propagated.
    pub async fn remove_report(&self, id: &ReportId) -> Result<SyncOutcome> {
        let uid = self.session.uid();
        match self.reports.delete_report(&uid, id).await {
            Ok(_) => {}
            Err(Error::NotFound(_)) => {
                tracing::debug!("Report {} already deleted locally", id);
            }
            Err(error) => return Err(error),
        }

        self.propagate(
            &uid,
            SyncOperation::Delete {
                report_id: id.clone(),
            },
        )
        .await
    }

    /// Publish a draft as a report, then delete the draft
    pub async fn publish_draft(&self, draft_id: &DraftId) -> Result<(Report, SyncOutcome)> {
        let draft = self
            .drafts
            .get_draft(draft_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("draft {draft_id}")))?;

        let published = self.publish_report(draft.fields()).await?;

        if let Err(error) = self.drafts.delete_draft(draft_id).await {
            tracing::warn!(
                "Published draft {} as report {} but could not delete the draft: {}",
                draft_id,
                published.0.id,
                error
            );
        }
        Ok(published)
    }

    async fn propagate(&self, uid: &Uid, operation: SyncOperation) -> Result<SyncOutcome> {
        if uid.is_guest() {
            return Ok(SyncOutcome::LocalOnly);
        }

        let report_id = operation.report_id().clone();
        if self.connectivity.is_online() {
            // Older queued work for the same report must land first
            if self.engine.queue().has_pending(&report_id).await? {
                tracing::debug!("Report {} has queued work; queueing behind it", report_id);
            } else {
                match self.engine.execute(uid, &operation).await {
                    Ok(()) => {
                        tracing::debug!("Report {} {} synced inline", report_id, operation.kind());
                        return Ok(SyncOutcome::Synced);
                    }
                    Err(error) => tracing::warn!(
                        "Inline {} of report {} failed, queueing: {}",
                        operation.kind(),
                        report_id,
                        error
                    ),
                }
            }
        }

        let task_id = self.engine.queue().enqueue(operation).await?;
        let pending = self.engine.pending_count().await?;
        Ok(SyncOutcome::Queued { task_id, pending })
    }

    async fn refreshed(&self, uid: &Uid, report: Report) -> Report {
        match self.reports.get_report(uid, &report.id).await {
            Ok(Some(current)) => current,
            _ => report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryRecordStore, RecordStore};
    use crate::models::{Media, SyncKind, UserData};
    use crate::remote::{MemoryDocumentStore, RemoteCall, RemoteDocument, RemoteStore};
    use crate::sync::SyncQueue;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Harness {
        service: ReportService,
        engine: Arc<SyncEngine>,
        connectivity: Connectivity,
        remote: MemoryDocumentStore,
        store: MemoryRecordStore,
    }

    /// Accepts full writes but rejects every partial update
    struct RejectingUpdates(MemoryDocumentStore);

    #[async_trait]
    impl RemoteStore for RejectingUpdates {
        async fn set_document(
            &self,
            uid: &str,
            report_id: &ReportId,
            document: &ReportDocument,
        ) -> Result<()> {
            self.0.set_document(uid, report_id, document).await
        }

        async fn update_document(
            &self,
            _: &str,
            _: &ReportId,
            _: &ReportDocumentPatch,
        ) -> Result<()> {
            Err(Error::Remote("update rejected".into()))
        }

        async fn delete_document(&self, uid: &str, report_id: &ReportId) -> Result<()> {
            self.0.delete_document(uid, report_id).await
        }

        async fn get_document(
            &self,
            uid: &str,
            report_id: &ReportId,
        ) -> Result<Option<ReportDocument>> {
            self.0.get_document(uid, report_id).await
        }

        async fn list_documents(&self, uid: &str) -> Result<Vec<RemoteDocument>> {
            self.0.list_documents(uid).await
        }
    }

    async fn harness(user: Option<&str>, online: bool) -> Harness {
        harness_with(user, online, |remote| Arc::new(remote)).await
    }

    async fn harness_with(
        user: Option<&str>,
        online: bool,
        wrap: impl FnOnce(MemoryDocumentStore) -> Arc<dyn RemoteStore>,
    ) -> Harness {
        let store = MemoryRecordStore::new();
        let shared: Arc<dyn RecordStore> = Arc::new(store.clone());
        let session = SessionContext::load(shared.clone()).await.unwrap();
        if let Some(uid) = user {
            session.sign_in(UserData::new(uid)).await.unwrap();
        }
        let reports = ReportRepository::new(shared.clone());
        let drafts = DraftRepository::new(shared.clone());
        let remote = MemoryDocumentStore::new();
        let engine = Arc::new(SyncEngine::new(
            Arc::new(SyncQueue::new(shared)),
            reports.clone(),
            wrap(remote.clone()),
            session.clone(),
        ));
        let connectivity = Connectivity::new(online);
        let service = ReportService::new(
            reports,
            drafts,
            engine.clone(),
            connectivity.clone(),
            session,
        );
        Harness {
            service,
            engine,
            connectivity,
            remote,
            store,
        }
    }

    fn pothole() -> ReportFields {
        ReportFields {
            title: "Pothole".into(),
            details: "Deep pothole near the school".into(),
            category: "Infrastructure".into(),
            location: "5th Ave".into(),
            media: vec![Media::photo("file:///pothole.jpg")],
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_create_is_queued_then_synced_when_online() {
        let h = harness(Some("u1"), false).await;

        let (report, outcome) = h.service.publish_report(pothole()).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Queued { pending: 1, .. }));

        let pending = h.engine.queue().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, SyncKind::Create);
        assert_eq!(pending[0].report_id(), &report.id);
        assert!(h.remote.calls().await.is_empty());

        h.connectivity.set_online(true);
        h.engine.process_sync_queue().await.unwrap();

        let document = h.remote.document("u1", &report.id).await.unwrap();
        assert_eq!(document.title, "Pothole");
        assert_eq!(document.location, "5th Ave");
        assert!(document.has_media);
        assert_eq!(document.media_count, 1);
        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
        assert!(h.service.get_report(&report.id).await.unwrap().unwrap().synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_create_syncs_inline() {
        let h = harness(Some("u1"), true).await;

        let (report, outcome) = h.service.publish_report(pothole()).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        assert!(report.synced);
        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
        assert!(h.remote.document("u1", &report.id).await.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_inline_write_falls_back_to_queue() {
        let h = harness(Some("u1"), true).await;
        h.remote.fail_next(1);

        let (report, outcome) = h.service.publish_report(pothole()).await.unwrap();

        assert!(matches!(outcome, SyncOutcome::Queued { .. }));
        assert!(!report.synced);
        assert_eq!(h.engine.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_remote_delete_is_queued_and_drained_idempotently() {
        let h = harness(Some("u1"), true).await;
        let (report, _) = h.service.publish_report(pothole()).await.unwrap();

        h.remote.fail_next(1);
        let outcome = h.service.remove_report(&report.id).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Queued { pending: 1, .. }));

        let pending = h.engine.queue().pending().await.unwrap();
        assert_eq!(pending[0].kind, SyncKind::Delete);
        assert_eq!(pending[0].retry_count, 0);
        assert_eq!(pending[0].report_id(), &report.id);

        // Another client removed the document meanwhile
        h.remote.delete_document("u1", &report.id).await.unwrap();

        let drained = h.engine.process_sync_queue().await.unwrap().unwrap();
        assert_eq!(drained.succeeded.len(), 1);
        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_twice_is_not_an_error() {
        let h = harness(Some("u1"), true).await;
        let (keep, _) = h.service.publish_report(pothole()).await.unwrap();
        let (gone, _) = h.service.publish_report(pothole()).await.unwrap();

        h.service.remove_report(&gone.id).await.unwrap();
        h.service.remove_report(&gone.id).await.unwrap();

        let remaining = h.service.list_reports().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn guest_reports_never_enter_the_queue() {
        let h = harness(None, true).await;

        let (report, outcome) = h.service.publish_report(pothole()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::LocalOnly);
        assert_eq!(report.uid, Uid::Guest);

        let patch = ReportPatch {
            title: Some("Bigger pothole".into()),
            ..ReportPatch::default()
        };
        h.service.edit_report(&report.id, &patch).await.unwrap();
        h.service.remove_report(&report.id).await.unwrap();

        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
        assert!(h.remote.calls().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_waits_behind_queued_create() {
        let h = harness(Some("u1"), false).await;
        let (report, _) = h.service.publish_report(pothole()).await.unwrap();

        h.connectivity.set_online(true);
        let patch = ReportPatch {
            title: Some("Pothole (patched)".into()),
            ..ReportPatch::default()
        };
        let (edited, outcome) = h.service.edit_report(&report.id, &patch).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Queued { pending: 2, .. }));
        assert!(edited.updated_at.is_some());
        assert!(h.remote.calls().await.is_empty());

        h.engine.process_sync_queue().await.unwrap();
        let document = h.remote.document("u1", &report.id).await.unwrap();
        assert_eq!(document.title, "Pothole (patched)");
        assert_eq!(
            h.remote
                .calls()
                .await
                .into_iter()
                .map(|call| matches!(call, RemoteCall::Set { .. }))
                .collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropped_edit_keeps_report_unsynced_for_requeue() {
        let h = harness_with(Some("u1"), false, |remote| {
            Arc::new(RejectingUpdates(remote))
        })
        .await;
        let (report, _) = h.service.publish_report(pothole()).await.unwrap();
        let patch = ReportPatch {
            title: Some("Pothole (patched)".into()),
            ..ReportPatch::default()
        };
        h.service.edit_report(&report.id, &patch).await.unwrap();

        h.connectivity.set_online(true);
        for _ in 0..3 {
            h.engine.process_sync_queue().await.unwrap();
        }
        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
        assert_eq!(
            h.remote.document("u1", &report.id).await.unwrap().title,
            "Pothole"
        );

        let local = h.service.get_report(&report.id).await.unwrap().unwrap();
        assert!(!local.synced);
        assert_eq!(h.engine.requeue_unsynced().await.unwrap(), 1);

        // The requeued create carries the edited snapshot
        h.engine.process_sync_queue().await.unwrap();
        assert_eq!(
            h.remote.document("u1", &report.id).await.unwrap().title,
            "Pothole (patched)"
        );
        assert!(h.service.get_report(&report.id).await.unwrap().unwrap().synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_edit_is_rejected() {
        let h = harness(Some("u1"), true).await;
        let (report, _) = h.service.publish_report(pothole()).await.unwrap();
        let error = h
            .service
            .edit_report(&report.id, &ReportPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_draft_creates_report_and_removes_draft() {
        let h = harness(Some("u1"), false).await;
        let draft = h.service.drafts().save_draft(pothole()).await.unwrap();

        let (report, outcome) = h.service.publish_draft(&draft.id).await.unwrap();

        assert_eq!(report.title, "Pothole");
        assert!(matches!(outcome, SyncOutcome::Queued { .. }));
        assert!(h.service.drafts().list_drafts().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn incomplete_draft_cannot_be_published() {
        let h = harness(Some("u1"), false).await;
        let draft = h
            .service
            .drafts()
            .save_draft(ReportFields {
                title: "Half done".into(),
                ..ReportFields::default()
            })
            .await
            .unwrap();

        let error = h.service.publish_draft(&draft.id).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert_eq!(h.service.drafts().list_drafts().await.unwrap().len(), 1);
        assert!(h.service.list_reports().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn storage_fault_aborts_publish_without_queueing() {
        let h = harness(Some("u1"), false).await;
        h.store.set_fail_writes(true);

        let error = h.service.publish_report(pothole()).await.unwrap_err();
        assert!(error.is_storage_fault());

        h.store.set_fail_writes(false);
        assert_eq!(h.engine.pending_count().await.unwrap(), 0);
    }
}
