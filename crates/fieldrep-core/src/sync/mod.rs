//! Offline-first synchronization: the durable queue and the engine draining it

mod engine;
mod queue;

pub(crate) use engine::apply_operation;
pub use engine::SyncEngine;
pub use queue::{DrainOutcome, SyncQueue, DEFAULT_MAX_RETRIES};
