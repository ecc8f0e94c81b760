//! Task storage and due-date input helpers.
//!
//! This module provides the `TaskStore` trait the calling flows persist
//! through, a JSON-file implementation of it, and the parsing helpers that
//! turn human due-date input into instants.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::fields::RepeatRule;
use crate::projector::DueDateUpdateRequest;
use crate::task::{format_instant, Task, TaskRecord};

/// Fields of a task that does not have an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub due: DateTime<Utc>,
    pub all_day: bool,
    pub repeat: RepeatRule,
    pub color: Option<String>,
    pub owner: Option<String>,
}

/// Persistence collaborator for tasks.
///
/// A write that fails leaves the store as it was before the call.
pub trait TaskStore {
    /// Stored records, filtered to `owner` when one is given.
    fn records(&self, owner: Option<&str>) -> Vec<TaskRecord>;

    /// The record with `id`, if any.
    fn record(&self, id: u64) -> Option<TaskRecord>;

    /// Overwrite a task's anchor. Repeating the same request is harmless and
    /// the last write wins.
    fn apply_due_update(&mut self, request: &DueDateUpdateRequest, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Store a new task and return it with its assigned id.
    fn insert(&mut self, task: NewTask, now: DateTime<Utc>) -> Result<Task, StoreError>;

    /// Replace the editable fields of an existing task.
    fn update(&mut self, task: &Task, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Delete a task.
    fn remove(&mut self, id: u64) -> Result<(), StoreError>;
}

/// In-memory contents of a task file.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub tasks: Vec<TaskRecord>,
}

#[derive(Deserialize)]
struct StoredFile {
    #[serde(default)]
    tasks: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct StoredFileRef<'a> {
    tasks: Vec<StoredEntry<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredEntry<'a> {
    Task(&'a TaskRecord),
    Raw(&'a serde_json::Value),
}

impl Database {
    /// Load from a JSON file; a missing file is an empty database.
    ///
    /// Each entry is read on its own, so one entry of the wrong shape is
    /// salvaged instead of failing the whole file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        let file: StoredFile =
            serde_json::from_str(&buf).map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })?;
        let tasks = file
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, value)| match TaskRecord::deserialize(&value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(path = %path.display(), index, error = %e, "unreadable task entry");
                    TaskRecord::salvage(value, e.to_string())
                }
            })
            .collect();
        Ok(Database { tasks })
    }

    /// Save to a JSON file using atomic write (temp file + rename).
    /// Unreadable entries are written back as they were found.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let file = StoredFileRef {
            tasks: self
                .tasks
                .iter()
                .map(|r| match &r.unreadable {
                    Some(bad) => StoredEntry::Raw(&bad.raw),
                    None => StoredEntry::Task(r),
                })
                .collect(),
        };
        let data = serde_json::to_string_pretty(&file)
            .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })?;
        write_atomic(path, data.as_bytes()).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a record by ID.
    pub fn get(&self, id: u64) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == Some(id))
    }

    /// Get a mutable reference to a readable record by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut TaskRecord> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == Some(id) && t.unreadable.is_none())
    }
}

/// Write a file via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(data)?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// A [`TaskStore`] backed by one JSON file, saved after every change.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    db: Database,
}

impl JsonTaskStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let db = Database::load(&path)?;
        Ok(JsonTaskStore { path, db })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the database and adopt the copy once it
    /// is on disk.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Database) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut next = self.db.clone();
        let out = change(&mut next)?;
        next.save(&self.path)?;
        self.db = next;
        Ok(out)
    }
}

impl TaskStore for JsonTaskStore {
    fn records(&self, owner: Option<&str>) -> Vec<TaskRecord> {
        self.db
            .tasks
            .iter()
            .filter(|t| owner.is_none() || t.owner.as_deref() == owner)
            .cloned()
            .collect()
    }

    fn record(&self, id: u64) -> Option<TaskRecord> {
        self.db.get(id).cloned()
    }

    fn apply_due_update(&mut self, request: &DueDateUpdateRequest, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.commit(|db| {
            let record = db.get_mut(request.task_id).ok_or(StoreError::NotFound(request.task_id))?;
            record.due = Some(format_instant(request.new_due));
            record.updated_at_utc = Some(now.timestamp());
            Ok(())
        })
    }

    fn insert(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task, StoreError> {
        self.commit(|db| {
            let task = Task {
                id: db.next_id(),
                name: new.name,
                due: new.due,
                all_day: new.all_day,
                repeat: new.repeat,
                color: new.color,
                owner: new.owner,
            };
            db.tasks.push(TaskRecord::from_task(&task, now.timestamp()));
            Ok(task)
        })
    }

    fn update(&mut self, task: &Task, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.commit(|db| {
            let record = db.get_mut(task.id).ok_or(StoreError::NotFound(task.id))?;
            let created = record.created_at_utc;
            *record = TaskRecord::from_task(task, now.timestamp());
            record.created_at_utc = created.or(record.created_at_utc);
            Ok(())
        })
    }

    fn remove(&mut self, id: u64) -> Result<(), StoreError> {
        self.commit(|db| {
            let before = db.tasks.len();
            db.tasks.retain(|t| t.id != Some(id));
            if db.tasks.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }
}

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow"
/// - "monday".."sunday" (and "mon".."sun"), "next friday"
/// - "end of week", "end of month"
/// - "in 3d", "in 2w", "in 1m", "in 1y"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "end of week" | "eow" => {
            let weekday = today.weekday().num_days_from_monday() as i64;
            return Some(today + Duration::days(6 - weekday));
        }
        "end of month" | "eom" => {
            let first = today.with_day(1)?;
            return first.checked_add_months(Months::new(1))?.pred_opt();
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let unit = rest.chars().last()?;
        let n: u32 = rest[..rest.len() - unit.len_utf8()].trim().parse().ok()?;
        return match unit {
            'd' => today.checked_add_days(chrono::Days::new(u64::from(n))),
            'w' => today.checked_add_days(chrono::Days::new(7 * u64::from(n))),
            'm' => today.checked_add_months(Months::new(n)),
            'y' => today.checked_add_months(Months::new(n.checked_mul(12)?)),
            _ => None,
        };
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", day_name) {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Parse "HH:MM" (24-hour) time input.
pub fn parse_time_input(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Wall-clock time stored for all-day tasks.
pub fn all_day_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}

/// Combine a local date and time into an instant.
pub fn local_instant<Tz: TimeZone>(date: NaiveDate, time: NaiveTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Resolve `--due`/`--time` arguments into `(instant, all_day)`.
///
/// A full RFC 3339 instant is taken as-is. Otherwise the date expression is
/// read relative to today in `tz`; without a time the task is all-day and
/// stored at 23:59 local, as the date picker does.
pub fn resolve_due<Tz: TimeZone>(
    due: &str,
    time: Option<&str>,
    today: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Utc>, bool), String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(due.trim()) {
        return Ok((instant.with_timezone(&Utc), false));
    }
    let date = parse_due_input(due, today).ok_or_else(|| format!("Unrecognised due date '{}'", due))?;
    let (time, all_day) = match time {
        Some(t) => (parse_time_input(t).ok_or_else(|| format!("Unrecognised time '{}', expected HH:MM", t))?, false),
        None => (all_day_time(), true),
    };
    let instant = local_instant(date, time, tz).ok_or_else(|| format!("{} {} does not exist locally", date, time))?;
    Ok((instant, all_day))
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
