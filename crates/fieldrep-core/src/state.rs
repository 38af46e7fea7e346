//! Shared sync state observed by collaborators.

/// Unified sync state published by the sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Network is known to be unreachable
    Offline,
    /// A drain is in flight
    Syncing,
    /// The last drain left the queue empty
    #[default]
    Synced,
    /// The last drain retained failed tasks for a later pass
    Error,
}
