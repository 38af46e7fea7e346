//! Data models for Fieldrep

/// Declares an opaque, string-backed identifier generated from UUID v7
/// (time-sortable), while still accepting any non-empty stored id.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new unique, creation-ordered ID
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7().to_string())
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Err(crate::Error::InvalidInput(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }
        }
    };
}

mod document;
mod draft;
mod media;
mod preferences;
mod report;
mod sync_task;
mod user;

pub use document::{ReportDocument, ReportDocumentPatch};
pub use draft::{Draft, DraftId};
pub use media::{Media, MediaType, MAX_MEDIA};
pub use preferences::{Preferences, ThemeMode, DEFAULT_LANGUAGE};
pub use report::{Report, ReportFields, ReportId, ReportPatch, REPORT_CATEGORIES};
pub use sync_task::{SyncKind, SyncOperation, SyncPayload, SyncTask, SyncTaskId};
pub use user::{Uid, UserData, GUEST_UID};
