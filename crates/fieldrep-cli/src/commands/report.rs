use chrono::Utc;
use fieldrep_core::db::SortOrder;
use fieldrep_core::{AppContext, SyncOutcome};
use serde::Serialize;

use crate::cli::FieldArgs;
use crate::commands::common::{
    fields_from_args, format_report_detail, format_report_lines, patch_from_args, print_json,
    report_to_list_item, resolve_report, ReportListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ChangeResult<'a> {
    id: &'a str,
    sync: String,
}

fn print_change(id: &str, outcome: &SyncOutcome, as_json: bool) -> Result<(), CliError> {
    if as_json {
        return print_json(&ChangeResult {
            id,
            sync: outcome.describe(),
        });
    }
    println!("{id}  ({})", outcome.describe());
    Ok(())
}

pub async fn run_report_add(
    context: &AppContext,
    args: FieldArgs,
    as_json: bool,
) -> Result<(), CliError> {
    let (report, outcome) = context.reports.publish_report(fields_from_args(args)).await?;
    print_change(report.id.as_str(), &outcome, as_json)
}

pub async fn run_report_list(
    context: &AppContext,
    search: Option<&str>,
    oldest_first: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let uid = context.session.uid();
    let repository = context.reports.reports();
    let mut reports = match search {
        Some(query) => repository.search_reports(&uid, query).await?,
        None => {
            let order = if oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            };
            repository.list_reports_sorted(&uid, order).await?
        }
    };
    if search.is_some() && oldest_first {
        reports.reverse();
    }

    let now = Utc::now();
    if as_json {
        let items = reports
            .iter()
            .map(|report| report_to_list_item(report, now))
            .collect::<Vec<ReportListItem>>();
        return print_json(&items);
    }

    if reports.is_empty() {
        println!("No reports yet.");
        return Ok(());
    }
    for line in format_report_lines(&reports, now) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_report_show(context: &AppContext, id: &str, as_json: bool) -> Result<(), CliError> {
    let report = resolve_report(&context.reports, id).await?;
    if as_json {
        return print_json(&report);
    }
    for line in format_report_detail(&report, Utc::now()) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_report_edit(
    context: &AppContext,
    id: &str,
    args: FieldArgs,
    as_json: bool,
) -> Result<(), CliError> {
    let patch = patch_from_args(args)?;
    let report = resolve_report(&context.reports, id).await?;
    let (report, outcome) = context.reports.edit_report(&report.id, &patch).await?;
    print_change(report.id.as_str(), &outcome, as_json)
}

pub async fn run_report_delete(
    context: &AppContext,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let report = resolve_report(&context.reports, id).await?;
    let outcome = context.reports.remove_report(&report.id).await?;
    print_change(report.id.as_str(), &outcome, as_json)
}
