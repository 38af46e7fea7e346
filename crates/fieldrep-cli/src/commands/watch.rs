use std::time::Duration;

use fieldrep_core::AppContext;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::commands::common::sync_state_label;
use crate::error::CliError;

/// Probe the remote on an interval and let the connectivity monitor drain
/// the queue whenever it becomes reachable. Runs until Ctrl+C.
pub async fn run_watch(context: &AppContext, probe_interval: Duration) -> Result<(), CliError> {
    if !context.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let monitor = context.monitor().spawn(async move {
        let _ = shutdown_rx.await;
    });
    let mut states = context.engine.subscribe();
    let mut probes = tokio::time::interval(probe_interval.max(Duration::from_secs(1)));
    probes.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Watching for connectivity changes (Ctrl+C to stop)");
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                break;
            }
            _ = probes.tick() => {
                context.refresh_connectivity().await;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                let pending = context.engine.pending_count().await?;
                println!("sync: {} ({pending} pending)", sync_state_label(state));
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(error) = monitor.await {
        tracing::warn!("Connectivity monitor ended abnormally: {}", error);
    }
    Ok(())
}
