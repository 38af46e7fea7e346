//! Local persistence for Fieldrep

mod connection;
mod draft_repository;
pub mod keys;
mod memory;
mod migrations;
mod preferences_repository;
mod record_store;
mod report_repository;

pub use connection::Database;
pub use draft_repository::DraftRepository;
pub use memory::MemoryRecordStore;
pub use preferences_repository::PreferencesRepository;
pub use record_store::{load_json, save_json, LibSqlRecordStore, RecordStore};
pub use report_repository::{ReportRepository, SortOrder};
