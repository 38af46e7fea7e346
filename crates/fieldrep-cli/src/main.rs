//! Fieldrep CLI - Command-line client for offline-first field reporting
//!
//! Reports are written locally first and synced to the remote document store
//! whenever it is reachable.

mod cli;
mod commands;
mod error;


use std::time::Duration;

use clap::Parser;
use fieldrep_core::AppContext;

use crate::cli::{Cli, Commands, DraftCommands, ReportCommands};
use crate::commands::common::{config_path, load_config, resolve_db_path};
use crate::commands::draft::{run_draft_delete, run_draft_list, run_draft_publish, run_draft_save};
use crate::commands::prefs::run_prefs;
use crate::commands::report::{
    run_report_add, run_report_delete, run_report_edit, run_report_list, run_report_show,
};
use crate::commands::session::{run_login, run_logout, run_whoami};
use crate::commands::sync::{run_queue, run_status, run_sync};
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fieldrep=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(config_path().as_deref())?;
    let db_path = resolve_db_path(cli.db_path, &config)?;
    tracing::debug!("Opening database at {}", db_path.display());

    let context = AppContext::open(&config, db_path).await?;
    if cli.offline {
        context.connectivity.set_online(false);
        context.engine.mark_offline();
    } else if context.has_remote() {
        context.refresh_connectivity().await;
    }

    dispatch(&context, cli.command, cli.json).await
}

async fn dispatch(context: &AppContext, command: Commands, as_json: bool) -> Result<(), CliError> {
    match command {
        Commands::Report { command } => match command {
            ReportCommands::Add(fields) => run_report_add(context, fields, as_json).await?,
            ReportCommands::List { search, oldest } => {
                run_report_list(context, search.as_deref(), oldest, as_json).await?;
            }
            ReportCommands::Show { id } => run_report_show(context, &id, as_json).await?,
            ReportCommands::Edit { id, fields } => {
                run_report_edit(context, &id, fields, as_json).await?;
            }
            ReportCommands::Delete { id } => run_report_delete(context, &id, as_json).await?,
        },
        Commands::Draft { command } => match command {
            DraftCommands::Save { id, fields } => {
                run_draft_save(context, id.as_deref(), fields, as_json).await?;
            }
            DraftCommands::List => run_draft_list(context, as_json).await?,
            DraftCommands::Delete { id } => run_draft_delete(context, &id).await?,
            DraftCommands::Publish { id } => run_draft_publish(context, &id, as_json).await?,
        },
        Commands::Sync { prune, requeue } => run_sync(context, prune, requeue, as_json).await?,
        Commands::Queue => run_queue(context, as_json).await?,
        Commands::Status => run_status(context, as_json).await?,
        Commands::Login { uid, email, name } => run_login(context, &uid, email, name).await?,
        Commands::Logout => run_logout(context).await?,
        Commands::Whoami => run_whoami(context, as_json)?,
        Commands::Prefs { theme, language } => {
            run_prefs(context, theme.map(Into::into), language.as_deref(), as_json).await?;
        }
        Commands::Watch { probe_interval } => {
            run_watch(context, Duration::from_secs(probe_interval)).await?;
        }
    }

    Ok(())
}
