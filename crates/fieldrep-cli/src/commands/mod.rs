pub mod common;
pub mod draft;
pub mod prefs;
pub mod report;
pub mod session;
pub mod sync;
pub mod watch;
