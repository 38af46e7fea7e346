use chrono::Utc;
use fieldrep_core::AppContext;
use serde::Serialize;

use crate::cli::FieldArgs;
use crate::commands::common::{
    draft_to_list_item, fields_from_args, format_draft_lines, print_json, resolve_draft,
    DraftListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct PublishResult<'a> {
    draft_id: &'a str,
    report_id: &'a str,
    sync: String,
}

pub async fn run_draft_save(
    context: &AppContext,
    id: Option<&str>,
    args: FieldArgs,
    as_json: bool,
) -> Result<(), CliError> {
    let drafts = context.reports.drafts();
    let fields = fields_from_args(args);
    let draft = match id {
        Some(query) => {
            let existing = resolve_draft(&context.reports, query).await?;
            drafts.update_draft(&existing.id, fields).await?
        }
        None => drafts.save_draft(fields).await?,
    };

    if as_json {
        return print_json(&draft_to_list_item(&draft, Utc::now()));
    }
    println!("{}", draft.id);
    Ok(())
}

pub async fn run_draft_list(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let drafts = context.reports.drafts().list_drafts().await?;
    let now = Utc::now();

    if as_json {
        let items = drafts
            .iter()
            .map(|draft| draft_to_list_item(draft, now))
            .collect::<Vec<DraftListItem>>();
        return print_json(&items);
    }

    if drafts.is_empty() {
        println!("No drafts saved.");
        return Ok(());
    }
    for line in format_draft_lines(&drafts, now) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_draft_delete(context: &AppContext, id: &str) -> Result<(), CliError> {
    let draft = resolve_draft(&context.reports, id).await?;
    let deleted = context.reports.drafts().delete_draft(&draft.id).await?;
    println!("{}", deleted.id);
    Ok(())
}

pub async fn run_draft_publish(
    context: &AppContext,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let draft = resolve_draft(&context.reports, id).await?;
    let (report, outcome) = context.reports.publish_draft(&draft.id).await?;

    if as_json {
        return print_json(&PublishResult {
            draft_id: draft.id.as_str(),
            report_id: report.id.as_str(),
            sync: outcome.describe(),
        });
    }
    println!("{}  ({})", report.id, outcome.describe());
    Ok(())
}
