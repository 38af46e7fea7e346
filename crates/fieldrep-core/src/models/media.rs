//! Media attachment model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of media entries on a report or draft
pub const MAX_MEDIA: usize = 5;

/// Kind of captured media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
}

/// A photo or video attached to a report.
///
/// Only references (URI, optional inline thumbnail) are stored; the sync core
/// never uploads media binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Video length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Media {
    /// Reference a photo at `uri`
    #[must_use]
    pub fn photo(uri: impl Into<String>) -> Self {
        Self::new(uri, MediaType::Photo)
    }

    /// Reference a video at `uri`
    #[must_use]
    pub fn video(uri: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            duration,
            ..Self::new(uri, MediaType::Video)
        }
    }

    fn new(uri: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            uri: uri.into(),
            media_type,
            base64: None,
            thumbnail: None,
            duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_serializes_type_field() {
        let media = Media::video("file:///clip.mp4", Some(12.5));
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["duration"], 12.5);
        assert!(json.get("base64").is_none());
    }

    #[test]
    fn media_ids_are_unique() {
        assert_ne!(Media::photo("a").id, Media::photo("a").id);
    }
}
