//! User identity model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel uid for unauthenticated, local-only use
pub const GUEST_UID: &str = "guest";

/// Owning user of a report.
///
/// Serialized as a plain string; `"guest"` (or an empty value) is the guest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Uid {
    /// Local-only user whose reports never sync
    Guest,
    /// Authenticated user
    User(String),
}

impl Uid {
    /// Authenticated uid; blank or `"guest"` values collapse to [`Uid::Guest`]
    #[must_use]
    pub fn user(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Guest => GUEST_UID,
            Self::User(uid) => uid,
        }
    }

    /// The uid usable for remote sync, absent for the guest
    pub fn sync_uid(&self) -> Option<&str> {
        match self {
            Self::Guest => None,
            Self::User(uid) => Some(uid),
        }
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == GUEST_UID {
            Self::Guest
        } else {
            Self::User(trimmed.to_string())
        }
    }
}

impl From<Uid> for String {
    fn from(value: Uid) -> Self {
        match value {
            Uid::Guest => GUEST_UID.to_string(),
            Uid::User(uid) => uid,
        }
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed-in user record persisted under `UserData`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl UserData {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: Uid::user(uid),
            email: None,
            display_name: None,
        }
    }
}
