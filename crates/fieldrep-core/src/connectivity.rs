//! Connectivity signals and the monitor that turns them into sync runs

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sync::SyncEngine;

/// Application lifecycle state reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppState {
    #[default]
    Active,
    Inactive,
    Background,
}

/// Shared handle over the network and lifecycle signals.
///
/// Collaborators push changes in; the core reads the current value on demand
/// or subscribes to transitions.
#[derive(Clone)]
pub struct Connectivity {
    network: Arc<watch::Sender<bool>>,
    app_state: Arc<watch::Sender<AppState>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (network, _) = watch::channel(online);
        let (app_state, _) = watch::channel(AppState::Active);
        Self {
            network: Arc::new(network),
            app_state: Arc::new(app_state),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.network.borrow()
    }

    pub fn app_state(&self) -> AppState {
        *self.app_state.borrow()
    }

    /// Report network reachability; repeated values are not re-broadcast
    pub fn set_online(&self, online: bool) {
        let changed = self.network.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            tracing::info!(
                "Network is {}",
                if online { "reachable" } else { "unreachable" }
            );
        }
    }

    pub fn set_app_state(&self, state: AppState) {
        self.app_state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    pub fn subscribe_network(&self) -> watch::Receiver<bool> {
        self.network.subscribe()
    }

    pub fn subscribe_app_state(&self) -> watch::Receiver<AppState> {
        self.app_state.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Triggers queue drains when the device comes online or the app returns
/// to the foreground while online.
pub struct ConnectivityMonitor {
    connectivity: Connectivity,
    engine: Arc<SyncEngine>,
}

impl ConnectivityMonitor {
    pub const fn new(connectivity: Connectivity, engine: Arc<SyncEngine>) -> Self {
        Self {
            connectivity,
            engine,
        }
    }

    /// Check once at startup, then react to signal changes until `shutdown`
    /// resolves. A drain in progress always runs to completion.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut network = self.connectivity.subscribe_network();
        let mut app_state = self.connectivity.subscribe_app_state();
        network.borrow_and_update();
        app_state.borrow_and_update();

        if self.connectivity.is_online() {
            self.trigger("startup").await;
        } else {
            self.engine.mark_offline();
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                changed = network.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *network.borrow_and_update();
                    if online {
                        self.trigger("network restored").await;
                    } else {
                        self.engine.mark_offline();
                    }
                }
                changed = app_state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *app_state.borrow_and_update();
                    if state == AppState::Active && self.connectivity.is_online() {
                        self.trigger("app foregrounded").await;
                    }
                }
            }
        }

        tracing::debug!("Connectivity monitor stopped");
    }

    /// Run the monitor on the tokio runtime
    pub fn spawn(self, shutdown: impl Future<Output = ()> + Send + 'static) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn trigger(&self, reason: &str) {
        tracing::debug!("Sync triggered: {}", reason);
        match self.engine.process_sync_queue().await {
            Ok(Some(outcome)) if outcome.attempted() > 0 => {
                tracing::info!(
                    "Synced {} of {} queued task(s)",
                    outcome.succeeded.len(),
                    outcome.attempted()
                );
            }
            Ok(_) => {}
            Err(error) => tracing::warn!("Sync after {} failed: {}", reason, error),
        }
    }
}
