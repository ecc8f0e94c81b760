//! Command implementations for the CLI interface.
//!
//! Each handler opens the collaborators it needs, runs one flow from
//! `countdown_tracker::service` against a single `now`, and prints the result.
//! Fatal failures print to stderr and exit with status 1.

use std::path::Path;

use chrono::{DateTime, Local, Utc};
use clap::{CommandFactory, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use crossterm::style::{style, Color, Stylize};

use countdown_tracker::config::{DataPaths, Settings};
use countdown_tracker::db::{resolve_due, truncate, JsonTaskStore, NewTask};
use countdown_tracker::fields::{color_rgb, parse_color, RepeatRule, COLOR_OPTIONS, DEFAULT_COLOR};
use countdown_tracker::notify::{Delivery, ReminderOutbox};
use countdown_tracker::projector::ProjectedTask;
use countdown_tracker::reminder::ReminderEvent;
use countdown_tracker::remaining::OVERDUE;
use countdown_tracker::service::{self, Saved, TaskEdit};

use crate::cli::Cli;

/// On/off switch for settings.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(t: Toggle) -> bool {
        matches!(t, Toggle::On)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Task name.
        name: String,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday", "in 3d", or an RFC 3339 instant.
        #[arg(long)]
        due: String,
        /// Due time HH:MM. Without it the task is all-day.
        #[arg(long)]
        time: Option<String>,
        /// Repeat rule.
        #[arg(long, value_enum, default_value_t = RepeatRule::Off)]
        repeat: RepeatRule,
        /// Colour: palette number 1-18 (see `colors`) or #rrggbb.
        #[arg(long)]
        color: Option<String>,
    },

    /// List tasks with time remaining, rolling recurring tasks forward.
    List {
        /// Only show overdue tasks.
        #[arg(long)]
        overdue: bool,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// View a single task and its pending reminders.
    View {
        /// Task ID.
        id: u64,
    },

    /// Edit fields on a task and re-plan its reminders.
    Edit {
        /// Task ID.
        id: u64,
        #[arg(long)]
        name: Option<String>,
        /// New due date, same forms as `add --due`.
        #[arg(long)]
        due: Option<String>,
        /// New due time HH:MM (requires --due). Without it the task becomes all-day.
        #[arg(long, requires = "due")]
        time: Option<String>,
        #[arg(long, value_enum)]
        repeat: Option<RepeatRule>,
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a task and cancel its reminders.
    Delete {
        /// Task ID.
        id: u64,
    },

    /// Deliver reminders whose time has come.
    Remind,

    /// List reminders waiting to fire.
    Reminders,

    /// Show or change settings.
    Settings {
        /// Plan reminders for new and edited tasks.
        #[arg(long, value_enum)]
        notifications: Option<Toggle>,
        /// Owner new tasks are filed under and listings are filtered by.
        #[arg(long)]
        owner: Option<String>,
        /// Re-plan reminders when a recurring task rolls over.
        #[arg(long, value_enum)]
        replan_on_rollover: Option<Toggle>,
    },

    /// Show the colour palette.
    Colors,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1);
}

fn open_store(paths: &DataPaths) -> JsonTaskStore {
    JsonTaskStore::open(&paths.tasks).unwrap_or_else(|e| fail(e))
}

fn open_outbox(paths: &DataPaths) -> ReminderOutbox {
    ReminderOutbox::open(&paths.reminders).unwrap_or_else(|e| fail(e))
}

fn color_arg(s: &str) -> String {
    parse_color(s).unwrap_or_else(|| fail(format!("Unrecognised colour '{}'; use 1-18 or #rrggbb", s)))
}

fn swatch(color: &str) -> String {
    match color_rgb(color) {
        Some((r, g, b)) => style("■").with(Color::Rgb { r, g, b }).to_string(),
        None => " ".to_string(),
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Print projected tasks as a table.
pub fn print_table(tasks: &[ProjectedTask]) {
    println!("{:<5} {:<2} {:<18} {:<17} {:<8} {}", "ID", "", "Date", "Left", "Repeat", "Name");
    for t in tasks {
        let left = if t.time_remaining == OVERDUE {
            style(t.time_remaining.as_str()).with(Color::Red).to_string()
        } else {
            t.time_remaining.clone()
        };
        // Pad by the plain width; escape codes would skew `{:<17}`.
        let left = format!("{}{}", left, " ".repeat(17usize.saturating_sub(t.time_remaining.chars().count())));
        println!(
            "{:<5} {:<2} {:<18} {} {:<8} {}",
            t.id,
            swatch(&t.color),
            truncate(&t.formatted_date, 18),
            left,
            t.repeat_display,
            t.name
        );
    }
}

fn print_reminders(reminders: &[ReminderEvent]) {
    for r in reminders {
        println!("  {}  {}", local_time(r.fire_at), r.title);
    }
}

fn report_saved(verb: &str, saved: &Saved) {
    println!("{} task {}", verb, saved.task.id);
    if let Some(e) = &saved.reminder_error {
        eprintln!("warning: reminders not scheduled: {e}");
    } else if !saved.reminders.is_empty() {
        println!("Scheduled {} reminder(s):", saved.reminders.len());
        print_reminders(&saved.reminders);
    }
}

/// Add a new task.
pub fn cmd_add(
    paths: &DataPaths,
    settings: &Settings,
    now: DateTime<Utc>,
    name: String,
    due: String,
    time: Option<String>,
    repeat: RepeatRule,
    color: Option<String>,
) {
    let today = now.with_timezone(&Local).date_naive();
    let (due, all_day) = resolve_due(&due, time.as_deref(), today, &Local).unwrap_or_else(|e| fail(e));
    let color = color.as_deref().map(color_arg).unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let mut store = open_store(paths);
    let mut outbox = open_outbox(paths);
    let new = NewTask { name, due, all_day, repeat, color: Some(color), owner: None };
    match service::create_task(&mut store, &mut outbox, settings, new, now) {
        Ok(saved) => report_saved("Added", &saved),
        Err(e) => fail(e),
    }
}

/// List tasks, applying any recurrence rollover.
pub fn cmd_list(paths: &DataPaths, settings: &Settings, now: DateTime<Utc>, overdue: bool, limit: Option<usize>, json: bool) {
    let mut store = open_store(paths);
    let mut outbox = open_outbox(paths);
    let refreshed = service::refresh(&mut store, &mut outbox, settings, now, &Local);

    if refreshed.skipped > 0 {
        eprintln!("warning: skipped {} malformed task record(s)", refreshed.skipped);
    }
    for (update, e) in &refreshed.failed {
        eprintln!("warning: could not advance task {}: {e}", update.task_id);
    }

    let mut tasks = refreshed.tasks;
    if overdue {
        tasks.retain(|t| t.time_remaining == OVERDUE);
    }
    if let Some(n) = limit {
        tasks.truncate(n);
    }

    if json {
        match serde_json::to_string_pretty(&tasks) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(e),
        }
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        print_table(&tasks);
    }
}

/// View a single task.
pub fn cmd_view(paths: &DataPaths, settings: &Settings, now: DateTime<Utc>, id: u64) {
    let mut store = open_store(paths);
    let mut outbox = open_outbox(paths);
    let refreshed = service::refresh(&mut store, &mut outbox, settings, now, &Local);
    let Some(task) = refreshed.tasks.iter().find(|t| t.id == id) else {
        fail(format!("Task {} not found", id));
    };

    println!("ID:           {}", task.id);
    println!("Name:         {} {}", swatch(&task.color), task.name);
    println!("Due:          {}", local_time(task.effective_due));
    println!("Date:         {}", if task.formatted_date.is_empty() { "-" } else { task.formatted_date.as_str() });
    println!("Left:         {}", task.time_remaining);
    println!("Repeat:       {}", if task.repeat_display.is_empty() { "Off" } else { task.repeat_display.as_str() });
    println!("Colour:       {}", task.color);
    let pending = outbox.pending_for(id);
    if pending.is_empty() {
        println!("Reminders:    -");
    } else {
        println!("Reminders:");
        print_reminders(pending);
    }
}

/// Edit an existing task.
pub fn cmd_edit(
    paths: &DataPaths,
    settings: &Settings,
    now: DateTime<Utc>,
    id: u64,
    name: Option<String>,
    due: Option<String>,
    time: Option<String>,
    repeat: Option<RepeatRule>,
    color: Option<String>,
) {
    let today = now.with_timezone(&Local).date_naive();
    let due = due.map(|d| resolve_due(&d, time.as_deref(), today, &Local).unwrap_or_else(|e| fail(e)));
    let edit = TaskEdit { name, due, repeat, color: color.as_deref().map(color_arg) };

    let mut store = open_store(paths);
    let mut outbox = open_outbox(paths);
    match service::edit_task(&mut store, &mut outbox, settings, id, edit, now) {
        Ok(saved) => report_saved("Updated", &saved),
        Err(e) => fail(e),
    }
}

/// Delete a task.
pub fn cmd_delete(paths: &DataPaths, id: u64) {
    let mut store = open_store(paths);
    let mut outbox = open_outbox(paths);
    match service::delete_task(&mut store, &mut outbox, id) {
        Ok(cancel_error) => {
            println!("Deleted task {}", id);
            if let Some(e) = cancel_error {
                eprintln!("warning: reminders not cancelled: {e}");
            }
        }
        Err(e) => fail(e),
    }
}

/// Deliver due reminders.
pub fn cmd_remind(paths: &DataPaths, now: DateTime<Utc>) {
    let mut outbox = open_outbox(paths);
    let delivered = outbox.take_due(now).unwrap_or_else(|e| fail(e));
    if delivered.is_empty() {
        println!("No reminders due.");
        return;
    }
    let mut expired = 0;
    for d in &delivered {
        match d.delivery {
            Delivery::Fired => println!("{}\n  {}", style(d.event.title.as_str()).bold(), d.event.body),
            Delivery::Expired => expired += 1,
        }
    }
    if expired > 0 {
        println!("{} reminder(s) expired before they could be shown.", expired);
    }
}

/// List pending reminders.
pub fn cmd_reminders(paths: &DataPaths) {
    let outbox = open_outbox(paths);
    let pending = outbox.pending();
    if pending.is_empty() {
        println!("No reminders scheduled.");
        return;
    }
    println!("{:<5} {:<17} {}", "Task", "Fires", "Title");
    for (task_id, r) in pending {
        println!("{:<5} {:<17} {}", task_id, local_time(r.fire_at), r.title);
    }
}

/// Show or change settings.
pub fn cmd_settings(
    settings_path: &Path,
    mut settings: Settings,
    notifications: Option<Toggle>,
    owner: Option<String>,
    replan_on_rollover: Option<Toggle>,
) {
    let changed = notifications.is_some() || owner.is_some() || replan_on_rollover.is_some();
    if let Some(t) = notifications {
        settings.notifications_enabled = t.into();
    }
    if let Some(o) = owner {
        let o = o.trim().to_string();
        if o.is_empty() {
            fail("Owner cannot be empty");
        }
        settings.owner = o;
    }
    if let Some(t) = replan_on_rollover {
        settings.replan_on_rollover = t.into();
    }
    if changed {
        settings.save(settings_path).unwrap_or_else(|e| fail(e));
    }
    let on_off = |b: bool| if b { "on" } else { "off" };
    println!("notifications:       {}", on_off(settings.notifications_enabled));
    println!("owner:               {}", settings.owner);
    println!("replan-on-rollover:  {}", on_off(settings.replan_on_rollover));
}

/// Show the colour palette.
pub fn cmd_colors() {
    for (i, c) in COLOR_OPTIONS.iter().enumerate() {
        println!("{:>2}  {} {}", i + 1, swatch(c), c);
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
