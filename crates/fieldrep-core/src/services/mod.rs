//! Client-facing services over the repositories and the sync engine

mod app;
mod reporting;

pub use app::AppContext;
pub use reporting::{ReportService, SyncOutcome};
