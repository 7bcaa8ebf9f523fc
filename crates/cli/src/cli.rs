use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI parser for the `scorebook` binary.
#[derive(Debug, Parser)]
#[command(name = "scorebook", version, about = "Aim trainer score history analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Stats directory (defaults to the stored `stats_path` setting)
    #[arg(long, global = true)]
    pub stats_dir: Option<PathBuf>,

    /// Run cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Idle minutes that start a new session (overrides settings)
    #[arg(long, global = true)]
    pub gap: Option<u32>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Also write daily log files to the app data directory
    #[arg(long, global = true)]
    pub log_file: bool,
}

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Scan the stats directory and update the cache.
    Scan,
    /// List sessions, newest first.
    Sessions {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Analyze one session against the history before it.
    Session(SessionArgs),
    /// Show a scenario family and its parsed modifiers.
    Family(FamilyArgs),
    /// Detailed statistics for one scenario.
    Stats(StatsArgs),
    /// Whole-profile totals.
    Profile,
    /// Per-day or per-month activity.
    Calendar {
        /// Roll up by month instead of day
        #[arg(long)]
        monthly: bool,
    },
    /// Half-hour activity curve of one day (YYYY-MM-DD).
    Day { date: chrono::NaiveDate },
    /// Manage favorite scenarios.
    Favorite {
        #[command(subcommand)]
        action: FavoriteCommands,
    },
    /// Read or change stored settings.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Re-scan whenever stat files change.
    Watch,
}

#[derive(Clone, Debug, Args)]
pub struct SessionArgs {
    /// Session id (defaults to the latest)
    #[arg(long)]
    pub id: Option<u32>,
    /// Trailing points averaged into the flow series
    #[arg(long)]
    pub flow_window: Option<usize>,
    /// One PB entry per beaten record instead of per scenario
    #[arg(long)]
    pub stack_pbs: Option<bool>,
}

#[derive(Clone, Debug, Args)]
pub struct FamilyArgs {
    /// Base scenario name
    pub base: String,
    /// Only the base and variants differing along this axis
    #[arg(long)]
    pub axis: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct StatsArgs {
    pub scenario: String,
    /// Restrict to one sensitivity (cm/360)
    #[arg(long)]
    pub sens: Option<f64>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum FavoriteCommands {
    Add { scenario: String },
    Remove { scenario: String },
    List,
}

#[derive(Clone, Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings.
    Show,
    /// Set a global value, or a per-scenario override with `--scenario`.
    Set {
        key: String,
        /// Parsed as JSON when possible, otherwise stored as a string
        value: String,
        #[arg(long)]
        scenario: Option<String>,
    },
}
