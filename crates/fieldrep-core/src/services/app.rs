//! Composition root wiring storage, session, sync, and connectivity.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::db::{
    DraftRepository, LibSqlRecordStore, PreferencesRepository, RecordStore, ReportRepository,
};
use crate::remote::{Disconnected, HttpDocumentStore, RemoteStore};
use crate::services::ReportService;
use crate::session::SessionContext;
use crate::sync::{SyncEngine, SyncQueue};
use crate::{Error, Result};

/// Every long-lived collaborator of a running client
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub session: SessionContext,
    pub reports: ReportService,
    pub preferences: PreferencesRepository,
    pub engine: Arc<SyncEngine>,
    pub connectivity: Connectivity,
    http: Option<HttpDocumentStore>,
}

impl AppContext {
    /// Open the on-disk store at `db_path` and the configured remote
    pub async fn open(config: &AppConfig, db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = LibSqlRecordStore::open_path(db_path).await?;

        let http = match &config.remote_base_url {
            Some(url) => Some(HttpDocumentStore::new(
                url.clone(),
                config.remote_auth_token.clone(),
                config.remote_timeout(),
            )?),
            None => {
                tracing::info!("No remote store configured; running local-only");
                None
            }
        };
        let remote: Arc<dyn RemoteStore> = match &http {
            Some(http) => Arc::new(http.clone()),
            None => Arc::new(Disconnected),
        };

        let mut context =
            Self::with_parts(Arc::new(store), remote, config.max_sync_retries).await?;
        context.http = http;
        Ok(context)
    }

    /// Wire a context from explicit stores
    pub async fn with_parts(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteStore>,
        max_sync_retries: u32,
    ) -> Result<Self> {
        let session = SessionContext::load(store.clone()).await?;
        let reports = ReportRepository::new(store.clone());
        let drafts = DraftRepository::new(store.clone());
        let queue = Arc::new(SyncQueue::with_max_retries(store.clone(), max_sync_retries));
        let engine = Arc::new(SyncEngine::new(
            queue,
            reports.clone(),
            remote,
            session.clone(),
        ));
        let connectivity = Connectivity::new(false);
        let service = ReportService::new(
            reports,
            drafts,
            engine.clone(),
            connectivity.clone(),
            session.clone(),
        );

        Ok(Self {
            preferences: PreferencesRepository::new(store.clone()),
            store,
            session,
            reports: service,
            engine,
            connectivity,
            http: None,
        })
    }

    pub const fn has_remote(&self) -> bool {
        self.http.is_some()
    }

    /// Probe the remote endpoint and publish the result as network reachability
    pub async fn refresh_connectivity(&self) -> bool {
        let online = match &self.http {
            Some(http) => http.probe().await,
            None => false,
        };
        self.connectivity.set_online(online);
        if !online {
            self.engine.mark_offline();
        }
        online
    }

    pub fn monitor(&self) -> ConnectivityMonitor {
        ConnectivityMonitor::new(self.connectivity.clone(), self.engine.clone())
    }

    /// Fail with `RemoteUnavailable` unless the remote is reachable
    pub fn require_online(&self) -> Result<()> {
        if self.connectivity.is_online() {
            Ok(())
        } else {
            Err(Error::RemoteUnavailable(
                "remote store is not reachable".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportFields, UserData};
    use crate::services::SyncOutcome;

    fn fields() -> ReportFields {
        ReportFields {
            title: "Flooded road".into(),
            details: "Road closed".into(),
            category: "Natural Disaster".into(),
            location: "River St".into(),
            media: Vec::new(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_only_context_queues_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let context = AppContext::open(&AppConfig::default(), tmp.path().join("fieldrep.db"))
            .await
            .unwrap();
        context.session.sign_in(UserData::new("u1")).await.unwrap();

        assert!(!context.has_remote());
        assert!(!context.refresh_connectivity().await);
        assert!(context.require_online().is_err());

        let (_, outcome) = context.reports.publish_report(fields()).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Queued { pending: 1, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn context_state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("fieldrep.db");

        {
            let context = AppContext::open(&AppConfig::default(), &db_path)
                .await
                .unwrap();
            context.session.sign_in(UserData::new("u1")).await.unwrap();
            context.reports.publish_report(fields()).await.unwrap();
        }

        let context = AppContext::open(&AppConfig::default(), &db_path)
            .await
            .unwrap();
        assert_eq!(context.session.sync_uid().as_deref(), Some("u1"));
        assert_eq!(context.reports.list_reports().await.unwrap().len(), 1);
        assert_eq!(context.engine.pending_count().await.unwrap(), 1);
    }
}
