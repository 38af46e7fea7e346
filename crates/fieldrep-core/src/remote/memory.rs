//! In-memory remote document store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{merge_patch, RemoteDocument, RemoteStore};
use crate::models::{ReportDocument, ReportDocumentPatch, ReportId};
use crate::{Error, Result};

/// A call observed by [`MemoryDocumentStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Set { uid: String, report_id: ReportId },
    Update { uid: String, report_id: ReportId },
    Delete { uid: String, report_id: ReportId },
    Get { uid: String, report_id: ReportId },
    List { uid: String },
}

/// Remote store double with switchable failures and call recording
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<Mutex<BTreeMap<(String, ReportId), ReportDocument>>>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
    offline: Arc<AtomicBool>,
    failures_left: Arc<AtomicU32>,
    latency_ms: Arc<AtomicU32>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `RemoteUnavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject the next `count` calls with a remote error
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Delay every call, to widen race windows in tests
    pub fn set_latency(&self, latency: Duration) {
        let millis = u32::try_from(latency.as_millis()).unwrap_or(u32::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing failure injection
    pub async fn insert(&self, uid: &str, report_id: &ReportId, document: ReportDocument) {
        self.documents
            .lock()
            .await
            .insert((uid.to_string(), report_id.clone()), document);
    }

    pub async fn document(&self, uid: &str, report_id: &ReportId) -> Option<ReportDocument> {
        self.documents
            .lock()
            .await
            .get(&(uid.to_string(), report_id.clone()))
            .cloned()
    }

    pub async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    /// Highest number of calls that were executing at the same time
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, call: RemoteCall) -> Result<InFlight<'_>> {
        self.calls.lock().await.push(call);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(latency))).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::RemoteUnavailable("network unreachable".to_string()));
        }
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::Remote("injected failure (500)".to_string()));
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for MemoryDocumentStore {
    async fn set_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        document: &ReportDocument,
    ) -> Result<()> {
        let _call = self
            .begin(RemoteCall::Set {
                uid: uid.to_string(),
                report_id: report_id.clone(),
            })
            .await?;
        self.documents
            .lock()
            .await
            .insert((uid.to_string(), report_id.clone()), document.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        patch: &ReportDocumentPatch,
    ) -> Result<()> {
        let _call = self
            .begin(RemoteCall::Update {
                uid: uid.to_string(),
                report_id: report_id.clone(),
            })
            .await?;
        let mut documents = self.documents.lock().await;
        let document = documents
            .get_mut(&(uid.to_string(), report_id.clone()))
            .ok_or_else(|| Error::NotFound(format!("remote document {report_id}")))?;
        merge_patch(document, patch);
        Ok(())
    }

    async fn delete_document(&self, uid: &str, report_id: &ReportId) -> Result<()> {
        let _call = self
            .begin(RemoteCall::Delete {
                uid: uid.to_string(),
                report_id: report_id.clone(),
            })
            .await?;
        self.documents
            .lock()
            .await
            .remove(&(uid.to_string(), report_id.clone()));
        Ok(())
    }

    async fn get_document(
        &self,
        uid: &str,
        report_id: &ReportId,
    ) -> Result<Option<ReportDocument>> {
        let _call = self
            .begin(RemoteCall::Get {
                uid: uid.to_string(),
                report_id: report_id.clone(),
            })
            .await?;
        Ok(self.document(uid, report_id).await)
    }

    async fn list_documents(&self, uid: &str) -> Result<Vec<RemoteDocument>> {
        let _call = self
            .begin(RemoteCall::List {
                uid: uid.to_string(),
            })
            .await?;
        let mut documents = self
            .documents
            .lock()
            .await
            .iter()
            .filter(|((owner, _), _)| owner == uid)
            .map(|((_, id), data)| RemoteDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect::<Vec<_>>();
        documents.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
        Ok(documents)
    }
}
