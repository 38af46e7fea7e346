use chrono::Utc;
use fieldrep_core::AppContext;
use serde::Serialize;

use crate::commands::common::{
    format_queue_lines, print_json, sync_state_label, task_to_queue_item, QueueItem,
};
use crate::error::CliError;

#[derive(Debug, Default, Serialize)]
pub struct SyncSummary {
    pub requeued: usize,
    pub succeeded: usize,
    pub retained: usize,
    pub dropped: usize,
    pub pruned: usize,
    pub coalesced: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    user: Option<String>,
    remote_configured: bool,
    online: bool,
    state: &'static str,
    pending: usize,
    /// Other uids with reports stored on this device
    other_users: Vec<String>,
}

/// Fail unless queued work can reach the remote store right now
fn ensure_can_sync(context: &AppContext) -> Result<(), CliError> {
    if context.session.sync_uid().is_none() {
        return Err(CliError::GuestSession);
    }
    if !context.has_remote() && !context.connectivity.is_online() {
        return Err(CliError::SyncNotConfigured);
    }
    context.require_online()?;
    Ok(())
}

pub async fn sync_once(
    context: &AppContext,
    prune: bool,
    requeue: bool,
) -> Result<SyncSummary, CliError> {
    ensure_can_sync(context)?;

    let mut summary = SyncSummary::default();
    if requeue {
        summary.requeued = context.engine.requeue_unsynced().await?;
    }

    match context.engine.process_sync_queue().await? {
        Some(outcome) => {
            summary.succeeded = outcome.succeeded.len();
            summary.retained = outcome.retained.len();
            summary.dropped = outcome.dropped.len();
        }
        None => summary.coalesced = true,
    }

    if prune {
        summary.pruned = context.engine.reconcile_remote_deletions().await?;
    }
    Ok(summary)
}

pub async fn run_sync(
    context: &AppContext,
    prune: bool,
    requeue: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let summary = sync_once(context, prune, requeue).await?;
    if as_json {
        return print_json(&summary);
    }

    if summary.coalesced {
        println!("Sync already in progress");
        return Ok(());
    }
    if summary.requeued > 0 {
        println!("Requeued {} unsynced report(s)", summary.requeued);
    }
    println!(
        "Sync completed: {} synced, {} waiting for retry, {} dropped",
        summary.succeeded, summary.retained, summary.dropped
    );
    if prune {
        println!("Removed {} remote document(s)", summary.pruned);
    }
    Ok(())
}

pub async fn run_queue(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let tasks = context.engine.queue().pending().await?;

    if as_json {
        let items = tasks
            .iter()
            .map(task_to_queue_item)
            .collect::<Vec<QueueItem>>();
        return print_json(&items);
    }

    if tasks.is_empty() {
        println!("Sync queue is empty.");
        return Ok(());
    }
    for line in format_queue_lines(&tasks, Utc::now()) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let status = StatusReport {
        user: context.session.sync_uid(),
        remote_configured: context.has_remote(),
        online: context.connectivity.is_online(),
        state: sync_state_label(context.engine.state()),
        pending: context.engine.pending_count().await?,
        other_users: other_report_owners(context).await?,
    };

    if as_json {
        return print_json(&status);
    }
    println!("user:    {}", status.user.as_deref().unwrap_or("guest"));
    println!(
        "remote:  {}",
        match (status.remote_configured, status.online) {
            (false, _) => "not configured",
            (true, true) => "reachable",
            (true, false) => "unreachable",
        }
    );
    println!("sync:    {}", status.state);
    println!("pending: {}", status.pending);
    if !status.other_users.is_empty() {
        println!("also on this device: {}", status.other_users.join(", "));
    }
    Ok(())
}

/// Users other than the current one whose reports are stored locally
pub async fn other_report_owners(context: &AppContext) -> Result<Vec<String>, CliError> {
    let current = context.session.uid();
    Ok(context
        .reports
        .reports()
        .list_owners()
        .await?
        .into_iter()
        .filter(|owner| owner != &current)
        .map(|owner| owner.to_string())
        .collect())
}
