//! Report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::{Media, MAX_MEDIA};
use super::user::Uid;
use crate::util::is_blank;
use crate::{Error, Result};

string_id!(
    /// A unique identifier for a report, immutable once assigned
    ReportId
);

/// Suggested report categories offered to reporters.
///
/// Free-text categories are accepted as well.
pub const REPORT_CATEGORIES: [&str; 9] = [
    "Accident",
    "Infrastructure",
    "Environment",
    "Health",
    "Crime",
    "Natural Disaster",
    "Community",
    "Politics",
    "Other",
];

/// User-editable report content, shared by reports and drafts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl ReportFields {
    /// Check that the fields can be published as a report.
    ///
    /// Title, details, category, and location must be non-empty after
    /// trimming, and at most [`MAX_MEDIA`] media entries are allowed.
    pub fn validate_for_publish(&self) -> Result<()> {
        let required = [
            ("title", &self.title),
            ("details", &self.details),
            ("category", &self.category),
            ("location", &self.location),
        ];
        let missing = required
            .iter()
            .filter(|(_, value)| is_blank(value))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }
        validate_media_count(&self.media)
    }

    /// A draft is empty when it has no title, no details, and no media.
    pub fn is_empty_draft(&self) -> bool {
        is_blank(&self.title) && is_blank(&self.details) && self.media.is_empty()
    }
}

pub(crate) fn validate_media_count(media: &[Media]) -> Result<()> {
    if media.len() > MAX_MEDIA {
        return Err(Error::InvalidInput(format!(
            "at most {MAX_MEDIA} media files per report (got {})",
            media.len()
        )));
    }
    Ok(())
}

/// Partial update applied to an existing report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,
}

impl ReportPatch {
    /// True when the patch changes nothing
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.media.is_none()
    }
}

/// A published field report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub uid: Uid,
    pub title: String,
    pub details: String,
    pub category: String,
    pub location: String,
    #[serde(default)]
    pub media: Vec<Media>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// True only after a confirmed remote write
    #[serde(default)]
    pub synced: bool,
}

impl Report {
    /// Build a new, unsynced report owned by `uid`
    #[must_use]
    pub fn new(uid: Uid, fields: ReportFields) -> Self {
        Self {
            id: ReportId::new(),
            uid,
            title: fields.title.trim().to_string(),
            details: fields.details.trim().to_string(),
            category: fields.category.trim().to_string(),
            location: fields.location.trim().to_string(),
            media: fields.media,
            created_at: Utc::now(),
            updated_at: None,
            synced: false,
        }
    }

    /// Merge `patch` into this report and stamp `updated_at`.
    ///
    /// The merged report must still be publishable. A successful edit clears
    /// `synced` until the remote update is confirmed.
    pub fn apply_patch(&mut self, patch: &ReportPatch) -> Result<()> {
        let mut merged = self.fields();
        if let Some(title) = &patch.title {
            merged.title = title.trim().to_string();
        }
        if let Some(details) = &patch.details {
            merged.details = details.trim().to_string();
        }
        if let Some(category) = &patch.category {
            merged.category = category.trim().to_string();
        }
        if let Some(location) = &patch.location {
            merged.location = location.trim().to_string();
        }
        if let Some(media) = &patch.media {
            merged.media.clone_from(media);
        }
        merged.validate_for_publish()?;

        self.title = merged.title;
        self.details = merged.details;
        self.category = merged.category;
        self.location = merged.location;
        self.media = merged.media;
        self.updated_at = Some(Utc::now());
        self.synced = false;
        Ok(())
    }

    /// Editable content of this report
    #[must_use]
    pub fn fields(&self) -> ReportFields {
        ReportFields {
            title: self.title.clone(),
            details: self.details.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            media: self.media.clone(),
        }
    }

    /// Case-insensitive title match used by list filtering
    #[must_use]
    pub fn title_matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.title.to_lowercase().contains(&query)
    }
}
