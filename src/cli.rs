use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use clap::Parser;

use crate::cmd::Commands;

/// Personal countdown tracker.
/// Storage defaults to ~/.countdown/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "countdown", version, about = "Task countdowns with recurring due dates and reminders")]
pub struct Cli {
    /// Path to the JSON task file. Settings and reminders live beside it.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Evaluate as of this RFC 3339 instant instead of the current time.
    #[arg(long, global = true)]
    pub now: Option<DateTime<FixedOffset>>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
