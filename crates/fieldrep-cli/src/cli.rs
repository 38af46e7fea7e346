use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fieldrep_core::models::ThemeMode;

#[derive(Parser)]
#[command(name = "fieldrep")]
#[command(about = "Capture field reports offline and sync them when connected")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Treat the remote store as unreachable
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish, list, and edit reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Save and publish unfinished reports
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Drain the sync queue now
    Sync {
        /// Delete remote documents whose reports were removed locally
        #[arg(long)]
        prune: bool,
        /// Queue unsynced reports that have no pending task
        #[arg(long)]
        requeue: bool,
    },
    /// Show pending sync tasks
    Queue,
    /// Show session, connectivity, and sync state
    Status,
    /// Sign in as a user; later reports sync under this uid
    Login {
        /// User ID
        uid: String,
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
    /// Sign out and continue as guest
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show or change device preferences
    Prefs {
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        /// Language code (e.g. en)
        #[arg(long, value_name = "CODE")]
        language: Option<String>,
    },
    /// Keep draining the queue as connectivity changes
    Watch {
        /// Seconds between reachability probes
        #[arg(long, default_value = "15", value_name = "SECS")]
        probe_interval: u64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Publish a new report
    #[command(alias = "new")]
    Add(FieldArgs),
    /// List reports, newest first
    List {
        /// Filter by title
        #[arg(long)]
        search: Option<String>,
        /// Oldest first
        #[arg(long)]
        oldest: bool,
    },
    /// Show one report
    Show {
        /// Report ID or unique ID prefix
        id: String,
    },
    /// Edit an existing report
    Edit {
        /// Report ID or unique ID prefix
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a report
    Delete {
        /// Report ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Save a new draft, or replace an existing one with --id
    Save {
        /// Draft ID or unique ID prefix to replace
        #[arg(long, value_name = "ID")]
        id: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List drafts, newest first
    List,
    /// Delete a draft
    Delete {
        /// Draft ID or unique ID prefix
        id: String,
    },
    /// Publish a draft as a report
    Publish {
        /// Draft ID or unique ID prefix
        id: String,
    },
}

/// Report content flags shared by add, edit, and draft save
#[derive(Args, Debug, Default, Clone)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub details: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Photo URI (repeatable)
    #[arg(long = "photo", value_name = "URI")]
    pub photos: Vec<String>,
    /// Video URI (repeatable)
    #[arg(long = "video", value_name = "URI")]
    pub videos: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}
