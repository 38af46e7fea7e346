//! fieldrep-core - Core library for Fieldrep
//!
//! Offline-first field reporting: reports and drafts are stored locally and
//! mutations to published reports are synchronized to a remote document
//! store through a durable, retry-bounded queue.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod session;
pub mod state;
pub mod sync;
pub mod util;

pub use config::AppConfig;
pub use connectivity::{AppState, Connectivity, ConnectivityMonitor};
pub use error::{Error, Result};
pub use models::{Draft, DraftId, Report, ReportFields, ReportId, ReportPatch, SyncTask, Uid};
pub use services::{AppContext, ReportService, SyncOutcome};
pub use session::SessionContext;
pub use state::SyncState;
pub use sync::{DrainOutcome, SyncEngine, SyncQueue};
