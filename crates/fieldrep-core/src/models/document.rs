//! Remote document shapes written to `users/{uid}/reports/{reportId}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::{Report, ReportPatch};

/// Full remote document for a report.
///
/// Media binaries stay on the device; only their presence and count sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: String,
    pub details: String,
    pub category: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub has_media: bool,
    pub media_count: usize,
    /// Stamped when the write is executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl From<&Report> for ReportDocument {
    fn from(report: &Report) -> Self {
        Self {
            title: report.title.clone(),
            details: report.details.clone(),
            category: report.category.clone(),
            location: report.location.clone(),
            created_at: report.created_at,
            updated_at: report.updated_at,
            has_media: !report.media.is_empty(),
            media_count: report.media.len(),
            synced_at: None,
        }
    }
}

/// Partial remote update; absent fields are left untouched remotely
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_media: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl ReportDocumentPatch {
    /// Remote patch for an edit, taking changed values from the merged report
    #[must_use]
    pub fn from_edit(patch: &ReportPatch, merged: &Report) -> Self {
        let media_changed = patch.media.is_some();
        Self {
            title: patch.title.as_ref().map(|_| merged.title.clone()),
            details: patch.details.as_ref().map(|_| merged.details.clone()),
            category: patch.category.as_ref().map(|_| merged.category.clone()),
            location: patch.location.as_ref().map(|_| merged.location.clone()),
            updated_at: merged.updated_at,
            has_media: media_changed.then(|| !merged.media.is_empty()),
            media_count: media_changed.then_some(merged.media.len()),
            synced_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Media, ReportFields, Uid};

    fn report() -> Report {
        Report::new(
            Uid::user("u1"),
            ReportFields {
                title: "Pothole".into(),
                details: "Deep".into(),
                category: "Infrastructure".into(),
                location: "5th Ave".into(),
                media: vec![Media::photo("file:///a.jpg")],
            },
        )
    }

    #[test]
    fn document_counts_media() {
        let document = ReportDocument::from(&report());
        assert!(document.has_media);
        assert_eq!(document.media_count, 1);
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("syncedAt").is_none());
        assert_eq!(json["mediaCount"], 1);
    }

    #[test]
    fn edit_patch_only_carries_changed_fields() {
        let mut merged = report();
        let patch = ReportPatch {
            title: Some("Large pothole".into()),
            ..ReportPatch::default()
        };
        merged.apply_patch(&patch).unwrap();

        let remote = ReportDocumentPatch::from_edit(&patch, &merged);
        assert_eq!(remote.title.as_deref(), Some("Large pothole"));
        assert_eq!(remote.details, None);
        assert_eq!(remote.media_count, None);
        assert!(remote.updated_at.is_some());
    }
}
