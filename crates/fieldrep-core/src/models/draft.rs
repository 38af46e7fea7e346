//! Draft model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::Media;
use super::report::ReportFields;

string_id!(
    /// A unique identifier for a draft
    DraftId
);

/// A not-yet-published report. Drafts live only on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: DraftId,
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
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Draft {
    #[must_use]
    pub fn new(fields: ReportFields) -> Self {
        Self {
            id: DraftId::new(),
            title: fields.title,
            details: fields.details,
            category: fields.category,
            location: fields.location,
            media: fields.media,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Replace the draft content and stamp `updated_at`
    pub fn replace_fields(&mut self, fields: ReportFields) {
        self.title = fields.title;
        self.details = fields.details;
        self.category = fields.category;
        self.location = fields.location;
        self.media = fields.media;
        self.updated_at = Some(Utc::now());
    }

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

    /// Title shown in lists
    #[must_use]
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Untitled Draft"
        } else {
            title
        }
    }
}
