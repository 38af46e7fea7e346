use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fieldrep_core::models::{Media, SyncTask};
use fieldrep_core::{AppConfig, Draft, Report, ReportFields, ReportPatch, ReportService, SyncState};
use serde::Serialize;

use crate::cli::FieldArgs;
use crate::error::CliError;

/// Characters of an id shown in listings; enough to cover the random bits
/// of a v7 uuid so listed prefixes stay unique in practice.
pub const SHORT_ID_LEN: usize = 18;

#[derive(Debug, Serialize)]
pub struct ReportListItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub location: String,
    pub created_at: String,
    pub relative_time: String,
    pub media_count: usize,
    pub synced: bool,
}

#[derive(Debug, Serialize)]
pub struct DraftListItem {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub relative_time: String,
    pub media_count: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: String,
    pub kind: String,
    pub report_id: String,
    pub retry_count: u32,
    pub queued_at: String,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fieldrep").join("config.json"))
}

/// Defaults, then the config file, then `FIELDREP_*` variables
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let file_config = match path {
        Some(path) => AppConfig::load_from_path(path),
        None => Ok(AppConfig::default()),
    };
    file_config
        .and_then(AppConfig::with_env)
        .map_err(|error| CliError::Config(error.to_string()))
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| config.db_path.clone()) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("fieldrep").join("fieldrep.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn normalize_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find the current user's report by exact id or unique id prefix
pub async fn resolve_report(service: &ReportService, query: &str) -> Result<Report, CliError> {
    let query = normalize_identifier(query)?;
    let reports = service.list_reports().await?;
    resolve_by_prefix(&query, reports, |report| report.id.as_str())
        .map_err(|error| error.unwrap_or_else(|| CliError::ReportNotFound(query.clone())))
}

pub async fn resolve_draft(service: &ReportService, query: &str) -> Result<Draft, CliError> {
    let query = normalize_identifier(query)?;
    let drafts = service.drafts().list_drafts().await?;
    resolve_by_prefix(&query, drafts, |draft| draft.id.as_str())
        .map_err(|error| error.unwrap_or_else(|| CliError::DraftNotFound(query.clone())))
}

/// Exact match wins; otherwise the prefix must match exactly one item.
/// `Err(None)` means nothing matched.
fn resolve_by_prefix<T>(
    query: &str,
    items: Vec<T>,
    id_of: impl Fn(&T) -> &str,
) -> Result<T, Option<CliError>> {
    let mut matches = Vec::new();
    for item in items {
        if id_of(&item) == query {
            return Ok(item);
        }
        if id_of(&item).starts_with(query) {
            matches.push(item);
        }
    }

    match matches.len() {
        0 => Err(None),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|item| short_id(id_of(item)))
                .collect::<Vec<_>>()
                .join(", ");
            Err(Some(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            ))))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

fn media_from_args(args: &FieldArgs) -> Vec<Media> {
    args.photos
        .iter()
        .map(Media::photo)
        .chain(args.videos.iter().map(|uri| Media::video(uri, None)))
        .collect()
}

pub fn fields_from_args(args: FieldArgs) -> ReportFields {
    let media = media_from_args(&args);
    ReportFields {
        title: args.title.unwrap_or_default(),
        details: args.details.unwrap_or_default(),
        category: args.category.unwrap_or_default(),
        location: args.location.unwrap_or_default(),
        media,
    }
}

/// Only flags that were passed become part of the patch; media flags
/// replace the whole media list.
pub fn patch_from_args(args: FieldArgs) -> Result<ReportPatch, CliError> {
    let media = media_from_args(&args);
    let patch = ReportPatch {
        title: args.title,
        details: args.details,
        category: args.category,
        location: args.location,
        media: (!media.is_empty()).then_some(media),
    };
    if patch.is_empty() {
        return Err(CliError::EmptyEdit);
    }
    Ok(patch)
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "Just now".to_string()
    } else if diff < hour {
        format!("{} min ago", diff / minute)
    } else if diff < day {
        format!("{} hrs ago", diff / hour)
    } else if diff < week {
        format!("{} days ago", diff / day)
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn report_status(report: &Report) -> &'static str {
    if report.uid.is_guest() {
        "local"
    } else if report.synced {
        "synced"
    } else {
        "pending"
    }
}

pub fn format_report_lines(reports: &[Report], now: DateTime<Utc>) -> Vec<String> {
    reports
        .iter()
        .map(|report| {
            let id = short_id(report.id.as_str());
            let title = title_preview(&report.title, 32);
            let relative_time = format_relative_time(report.created_at, now);
            format!(
                "{id:<18}  {title:<32}  {:<18}  {relative_time:<12}  {}",
                title_preview(&report.category, 18),
                report_status(report)
            )
        })
        .collect()
}

pub fn report_to_list_item(report: &Report, now: DateTime<Utc>) -> ReportListItem {
    ReportListItem {
        id: report.id.to_string(),
        title: report.title.clone(),
        category: report.category.clone(),
        location: report.location.clone(),
        created_at: report.created_at.to_rfc3339(),
        relative_time: format_relative_time(report.created_at, now),
        media_count: report.media.len(),
        synced: report.synced,
    }
}

pub fn format_report_detail(report: &Report, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        format!("ID:        {}", report.id),
        format!("Title:     {}", report.title),
        format!("Category:  {}", report.category),
        format!("Location:  {}", report.location),
        format!(
            "Created:   {} ({})",
            report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_relative_time(report.created_at, now)
        ),
    ];
    if let Some(updated_at) = report.updated_at {
        lines.push(format!(
            "Updated:   {}",
            updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    lines.push(format!("Status:    {}", report_status(report)));
    lines.push(format!("Media:     {}", report.media.len()));
    lines.push(String::new());
    lines.push(report.details.clone());
    lines
}

pub fn format_draft_lines(drafts: &[Draft], now: DateTime<Utc>) -> Vec<String> {
    drafts
        .iter()
        .map(|draft| {
            let id = short_id(draft.id.as_str());
            let title = title_preview(draft.display_title(), 40);
            let relative_time =
                format_relative_time(draft.updated_at.unwrap_or(draft.created_at), now);
            format!("{id:<18}  {title:<40}  {relative_time}")
        })
        .collect()
}

pub fn draft_to_list_item(draft: &Draft, now: DateTime<Utc>) -> DraftListItem {
    DraftListItem {
        id: draft.id.to_string(),
        title: draft.display_title().to_string(),
        created_at: draft.created_at.to_rfc3339(),
        relative_time: format_relative_time(draft.updated_at.unwrap_or(draft.created_at), now),
        media_count: draft.media.len(),
    }
}

pub fn format_queue_lines(tasks: &[SyncTask], now: DateTime<Utc>) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            format!(
                "{:<18}  {:<6}  report={}  retries={}  {}",
                short_id(task.id.as_str()),
                task.kind,
                short_id(task.data.report_id.as_str()),
                task.retry_count,
                format_relative_time(task.timestamp, now)
            )
        })
        .collect()
}

pub fn task_to_queue_item(task: &SyncTask) -> QueueItem {
    QueueItem {
        id: task.id.to_string(),
        kind: task.kind.to_string(),
        report_id: task.data.report_id.to_string(),
        retry_count: task.retry_count,
        queued_at: task.timestamp.to_rfc3339(),
    }
}

pub const fn sync_state_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Offline => "offline",
        SyncState::Syncing => "syncing",
        SyncState::Synced => "synced",
        SyncState::Error => "error",
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
