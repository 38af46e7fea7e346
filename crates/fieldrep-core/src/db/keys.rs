//! Fixed record-store keys

use crate::models::Uid;

/// Prefix of the per-user report list key
pub const REPORTS_PREFIX: &str = "Reports_";
/// Device-wide draft list
pub const DRAFT_REPORTS: &str = "DraftReports";
/// Persisted sync queue
pub const SYNC_QUEUE: &str = "SyncQueue";
/// Raw queue entries that could not be read as tasks
pub const SYNC_QUEUE_UNREADABLE: &str = "SyncQueueUnreadable";
/// Signed-in user record
pub const USER_DATA: &str = "UserData";
/// Theme preference
pub const APP_THEME: &str = "AppTheme";
/// Language preference
pub const APP_LANGUAGE: &str = "appLanguage";

/// Key holding the report list owned by `uid` (`Reports_<uid>`)
pub fn reports_key(uid: &Uid) -> String {
    format!("{REPORTS_PREFIX}{uid}")
}
