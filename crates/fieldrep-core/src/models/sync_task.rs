//! Sync task model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::{ReportDocument, ReportDocumentPatch};
use super::report::ReportId;
use crate::{Error, Result};

string_id!(
    /// A unique, creation-ordered identifier for a queued sync task
    SyncTaskId
);

/// Remote operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(label)
    }
}

/// Persisted task payload: the report reference plus a data snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub report_id: ReportId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<ReportDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_data: Option<ReportDocumentPatch>,
}

/// Validated remote operation carried by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    /// Write the full document
    Create {
        report_id: ReportId,
        document: ReportDocument,
    },
    /// Merge the patch into the existing document
    Update {
        report_id: ReportId,
        patch: ReportDocumentPatch,
    },
    /// Delete the document; an absent document counts as success
    Delete { report_id: ReportId },
}

impl SyncOperation {
    pub const fn kind(&self) -> SyncKind {
        match self {
            Self::Create { .. } => SyncKind::Create,
            Self::Update { .. } => SyncKind::Update,
            Self::Delete { .. } => SyncKind::Delete,
        }
    }

    pub const fn report_id(&self) -> &ReportId {
        match self {
            Self::Create { report_id, .. }
            | Self::Update { report_id, .. }
            | Self::Delete { report_id } => report_id,
        }
    }

    /// Local `updatedAt` of the report state this operation writes.
    ///
    /// `None` for deletes, which write no state.
    pub const fn written_version(&self) -> Option<Option<DateTime<Utc>>> {
        match self {
            Self::Create { document, .. } => Some(document.updated_at),
            Self::Update { patch, .. } => Some(patch.updated_at),
            Self::Delete { .. } => None,
        }
    }
}

/// A pending remote operation in the sync queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub id: SyncTaskId,
    #[serde(rename = "type")]
    pub kind: SyncKind,
    pub data: SyncPayload,
    /// Enqueue time
    pub timestamp: DateTime<Utc>,
    /// Failed attempts so far
    #[serde(default)]
    pub retry_count: u32,
}

impl SyncTask {
    #[must_use]
    pub fn new(operation: SyncOperation) -> Self {
        let kind = operation.kind();
        let data = match operation {
            SyncOperation::Create {
                report_id,
                document,
            } => SyncPayload {
                report_id,
                report_data: Some(document),
                update_data: None,
            },
            SyncOperation::Update { report_id, patch } => SyncPayload {
                report_id,
                report_data: None,
                update_data: Some(patch),
            },
            SyncOperation::Delete { report_id } => SyncPayload {
                report_id,
                report_data: None,
                update_data: None,
            },
        };

        Self {
            id: SyncTaskId::new(),
            kind,
            data,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    pub const fn report_id(&self) -> &ReportId {
        &self.data.report_id
    }

    /// Validate the stored payload against the task type
    pub fn operation(&self) -> Result<SyncOperation> {
        let report_id = self.data.report_id.clone();
        match self.kind {
            SyncKind::Create => {
                let document = self.data.report_data.clone().ok_or_else(|| {
                    Error::InvalidInput(format!("create task {} has no reportData", self.id))
                })?;
                Ok(SyncOperation::Create {
                    report_id,
                    document,
                })
            }
            SyncKind::Update => {
                let patch = self.data.update_data.clone().ok_or_else(|| {
                    Error::InvalidInput(format!("update task {} has no updateData", self.id))
                })?;
                Ok(SyncOperation::Update { report_id, patch })
            }
            SyncKind::Delete => Ok(SyncOperation::Delete { report_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn delete_task_serializes_like_stored_queue_entries() {
        let task = SyncTask::new(SyncOperation::Delete {
            report_id: ReportId::from("r1"),
        });
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "delete");
        assert_eq!(json["data"], serde_json::json!({ "reportId": "r1" }));
        assert_eq!(json["retryCount"], 0);
    }

    #[test]
    fn operation_roundtrips_through_task() {
        let operation = SyncOperation::Update {
            report_id: ReportId::from("r2"),
            patch: ReportDocumentPatch {
                title: Some("New".into()),
                ..ReportDocumentPatch::default()
            },
        };
        let task = SyncTask::new(operation.clone());
        assert_eq!(task.kind, SyncKind::Update);
        assert_eq!(task.operation().unwrap(), operation);
    }

    #[test]
    fn create_without_snapshot_is_rejected() {
        let raw = serde_json::json!({
            "id": "t1",
            "type": "create",
            "data": { "reportId": "r1" },
            "timestamp": "2024-05-01T10:00:00Z",
            "retryCount": 1
        });
        let task: SyncTask = serde_json::from_value(raw).unwrap();
        assert_eq!(task.retry_count, 1);
        assert!(task.operation().is_err());
    }
}
