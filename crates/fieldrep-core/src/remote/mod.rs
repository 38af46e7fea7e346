//! Remote document store boundary
//!
//! Report documents live at `users/{uid}/reports/{reportId}`. The remote is
//! only reachable while online and is eventually consistent with the local
//! record store.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ReportDocument, ReportDocumentPatch, ReportId};
use crate::{Error, Result};

pub use http::HttpDocumentStore;
pub use memory::{MemoryDocumentStore, RemoteCall};

/// A remote report document together with its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: ReportId,
    pub data: ReportDocument,
}

/// Remote document database holding synced reports
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write the full document, replacing any existing one
    async fn set_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        document: &ReportDocument,
    ) -> Result<()>;

    /// Merge `patch` into an existing document; fails with `NotFound` when absent
    async fn update_document(
        &self,
        uid: &str,
        report_id: &ReportId,
        patch: &ReportDocumentPatch,
    ) -> Result<()>;

    /// Delete the document; deleting an absent document succeeds
    async fn delete_document(&self, uid: &str, report_id: &ReportId) -> Result<()>;

    async fn get_document(&self, uid: &str, report_id: &ReportId)
        -> Result<Option<ReportDocument>>;

    /// All of the user's documents, newest `createdAt` first
    async fn list_documents(&self, uid: &str) -> Result<Vec<RemoteDocument>>;
}

/// Remote used when no endpoint is configured; every call is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl RemoteStore for Disconnected {
    async fn set_document(&self, _: &str, _: &ReportId, _: &ReportDocument) -> Result<()> {
        Err(not_configured())
    }

    async fn update_document(&self, _: &str, _: &ReportId, _: &ReportDocumentPatch) -> Result<()> {
        Err(not_configured())
    }

    async fn delete_document(&self, _: &str, _: &ReportId) -> Result<()> {
        Err(not_configured())
    }

    async fn get_document(&self, _: &str, _: &ReportId) -> Result<Option<ReportDocument>> {
        Err(not_configured())
    }

    async fn list_documents(&self, _: &str) -> Result<Vec<RemoteDocument>> {
        Err(not_configured())
    }
}

fn not_configured() -> Error {
    Error::RemoteUnavailable("no remote store configured".to_string())
}

/// Relative path of the user's report collection
pub fn collection_path(uid: &str) -> String {
    format!("users/{}/reports", urlencoding::encode(uid))
}

/// Relative path of one report document
pub fn document_path(uid: &str, report_id: &ReportId) -> String {
    format!(
        "{}/{}",
        collection_path(uid),
        urlencoding::encode(report_id.as_str())
    )
}

/// Apply a partial update to a stored document
pub(crate) fn merge_patch(document: &mut ReportDocument, patch: &ReportDocumentPatch) {
    if let Some(title) = &patch.title {
        document.title.clone_from(title);
    }
    if let Some(details) = &patch.details {
        document.details.clone_from(details);
    }
    if let Some(category) = &patch.category {
        document.category.clone_from(category);
    }
    if let Some(location) = &patch.location {
        document.location.clone_from(location);
    }
    if patch.updated_at.is_some() {
        document.updated_at = patch.updated_at;
    }
    if let Some(has_media) = patch.has_media {
        document.has_media = has_media;
    }
    if let Some(media_count) = patch.media_count {
        document.media_count = media_count;
    }
    if patch.synced_at.is_some() {
        document.synced_at = patch.synced_at;
    }
}
