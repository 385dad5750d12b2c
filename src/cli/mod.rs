use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::report::GroupBy;

#[derive(Debug, Parser)]
#[command(
    name = "timetrack",
    about = "Personal time tracker: timed sessions, streaks and goal reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timed session
    Start {
        /// Category label; falls back to the configured default
        category: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop the session and save it (sessions with no elapsed time are discarded)
    Stop,
    /// Discard the active session without saving
    Cancel,
    /// Show the active session and its live elapsed time
    Status,
    /// Add a manual entry
    Add {
        /// Start timestamp, e.g. "2026-03-10 09:00"
        #[arg(long)]
        start: String,
        /// End timestamp, must be after start
        #[arg(long)]
        end: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit an existing entry; duration is recomputed when start/end change
    Edit {
        id: i64,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an entry by id
    Delete { id: i64 },
    /// List entries, newest first
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Repeatable category filter
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Summary table plus streaks and goal progress
    Report {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long, value_enum, default_value = "date")]
        group_by: GroupByArg,
    },
    /// Today's total, streaks and goal progress
    Dashboard,
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Write entries to a CSV file
    Export {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Output path; defaults to time_tracker_<today>.csv in the export dir
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum GoalCommands {
    /// Set (overwrite) the goal targets for a category
    Set {
        category: String,
        #[arg(long, default_value_t = 0.0)]
        daily: f64,
        #[arg(long, default_value_t = 0.0)]
        weekly: f64,
        #[arg(long, default_value_t = 0.0)]
        monthly: f64,
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupByArg {
    Date,
    Week,
    Month,
    Category,
    Topic,
}

impl From<GroupByArg> for GroupBy {
    fn from(value: GroupByArg) -> Self {
        match value {
            GroupByArg::Date => GroupBy::Date,
            GroupByArg::Week => GroupBy::Week,
            GroupByArg::Month => GroupBy::Month,
            GroupByArg::Category => GroupBy::Category,
            GroupByArg::Topic => GroupBy::Topic,
        }
    }
}
