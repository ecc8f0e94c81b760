//! # countdown
//!
//! Command-line front end for `countdown_tracker`: add dated tasks, watch the
//! time left on each, and collect reminders a day before, an hour before and
//! at the due time.
//!
//! ## Key Commands
//!
//! - `countdown add <name> --due <date> [--time HH:MM] [--repeat daily]`
//! - `countdown list` - Time remaining per task; rolls recurring tasks forward
//! - `countdown edit <id>` / `countdown delete <id>`
//! - `countdown remind` - Deliver reminders whose time has come
//! - `countdown settings --notifications off`
//!
//! Data is stored locally in `~/.countdown/` (tasks, reminders and settings
//! as separate JSON files), or beside the file passed to `--db`.

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

use countdown_tracker::clock::{Clock, FixedClock, SystemClock};
use countdown_tracker::config::{DataPaths, Settings};
use countdown_tracker::logging;

mod cli;
mod cmd;

use cli::Cli;
use cmd::*;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let paths = DataPaths::resolve(cli.db.as_deref(), home.as_deref());
    tracing::debug!(dir = %paths.dir.display(), "data directory");

    let settings = match Settings::load(&paths.settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // One reading for the whole invocation.
    let now = match cli.now {
        Some(at) => FixedClock(at.with_timezone(&Utc)).now(),
        None => SystemClock.now(),
    };

    match cli.command {
        Commands::Add { name, due, time, repeat, color } =>
            cmd_add(&paths, &settings, now, name, due, time, repeat, color),

        Commands::List { overdue, limit, json } =>
            cmd_list(&paths, &settings, now, overdue, limit, json),

        Commands::View { id } => cmd_view(&paths, &settings, now, id),

        Commands::Edit { id, name, due, time, repeat, color } =>
            cmd_edit(&paths, &settings, now, id, name, due, time, repeat, color),

        Commands::Delete { id } => cmd_delete(&paths, id),

        Commands::Remind => cmd_remind(&paths, now),

        Commands::Reminders => cmd_reminders(&paths),

        Commands::Settings { notifications, owner, replan_on_rollover } =>
            cmd_settings(&paths.settings, settings, notifications, owner, replan_on_rollover),

        Commands::Colors => cmd_colors(),

        Commands::Completions { shell } => cmd_completions(shell),
    }
}
