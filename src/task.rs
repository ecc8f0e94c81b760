//! Task data structures and validation.
//!
//! A [`TaskRecord`] is what the store holds: every field optional, so that a
//! damaged or half-written entry can still be read and reported. An entry that
//! does not even have the shape of a record is kept as [`Unreadable`] so it can
//! be skipped and written back as found. A [`Task`] is a validated snapshot
//! that the engine works on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskValidationError;
use crate::fields::{RepeatRule, FALLBACK_COLOR};

/// A stored entry whose fields had the wrong types.
#[derive(Debug, Clone, PartialEq)]
pub struct Unreadable {
    /// The entry exactly as found.
    pub raw: serde_json::Value,
    pub reason: String,
}

/// Raw stored shape of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: Option<u64>,
    pub name: Option<String>,
    /// RFC 3339 instant.
    #[serde(alias = "date")]
    pub due: Option<String>,
    #[serde(alias = "allDay")]
    pub all_day: bool,
    pub repeat: RepeatRule,
    pub color: Option<String>,
    #[serde(alias = "uid")]
    pub owner: Option<String>,
    pub created_at_utc: Option<i64>,
    pub updated_at_utc: Option<i64>,
    /// Set when the entry could not be read as a record.
    #[serde(skip)]
    pub unreadable: Option<Unreadable>,
}

/// A validated, immutable task snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub name: String,
    /// Anchor instant for recurrence. All-day tasks may carry only date precision.
    pub due: DateTime<Utc>,
    pub all_day: bool,
    pub repeat: RepeatRule,
    pub color: Option<String>,
    pub owner: Option<String>,
}

impl Task {
    /// Colour to display, falling back when the task never had one.
    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or(FALLBACK_COLOR)
    }

    /// Copy of this task with a new anchor instant.
    pub fn with_due(&self, due: DateTime<Utc>) -> Task {
        Task { due, ..self.clone() }
    }
}

/// Trim a task name and reject it when nothing is left.
pub fn validate_name(name: &str) -> Result<String, TaskValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

impl TryFrom<&TaskRecord> for Task {
    type Error = TaskValidationError;

    fn try_from(record: &TaskRecord) -> Result<Self, Self::Error> {
        if let Some(bad) = &record.unreadable {
            return Err(TaskValidationError::Unreadable {
                id: record.id,
                reason: bad.reason.clone(),
            });
        }
        let id = record.id.ok_or(TaskValidationError::MissingId)?;
        let raw = record
            .due
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(TaskValidationError::MissingDue(id))?;
        let due = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|_| TaskValidationError::InvalidDue {
                id,
                raw: raw.to_string(),
            })?
            .with_timezone(&Utc);
        let name = validate_name(record.name.as_deref().unwrap_or_default())?;

        Ok(Task {
            id,
            name,
            due,
            all_day: record.all_day,
            repeat: record.repeat,
            color: record.color.clone(),
            owner: record.owner.clone(),
        })
    }
}

impl TaskRecord {
    /// Build a fresh record for a task about to be stored.
    pub fn from_task(task: &Task, now_utc: i64) -> Self {
        TaskRecord {
            id: Some(task.id),
            name: Some(task.name.clone()),
            due: Some(format_instant(task.due)),
            all_day: task.all_day,
            repeat: task.repeat,
            color: task.color.clone(),
            owner: task.owner.clone(),
            created_at_utc: Some(now_utc),
            updated_at_utc: Some(now_utc),
            unreadable: None,
        }
    }

    /// Wrap an entry that failed to deserialize, keeping whatever id, name
    /// and owner can still be recognised so it is listed and filtered like
    /// any other record.
    pub fn salvage(raw: serde_json::Value, reason: String) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| raw.get(*k).and_then(serde_json::Value::as_str))
                .map(str::to_string)
        };
        let id = raw.get("id").and_then(serde_json::Value::as_u64);
        let name = text(&["name"]);
        let owner = text(&["owner", "uid"]);
        TaskRecord {
            id,
            name,
            owner,
            unreadable: Some(Unreadable { raw, reason }),
            ..TaskRecord::default()
        }
    }
}

/// Serialise an instant the way the store keeps it.
pub fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
