//! Notification collaborator.
//!
//! Reminders are keyed by task id. Scheduling a task's reminders replaces
//! whatever was scheduled for it before, so editing a task several times never
//! stacks up duplicate alarms, and deleting a task cancels them.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::write_atomic;
use crate::error::NotifyError;
use crate::reminder::ReminderEvent;

/// How late a reminder may be delivered before it counts as expired.
pub const EXPIRY_GRACE_MINUTES: i64 = 60;

/// Where reminders are scheduled.
pub trait ReminderSink {
    /// Schedule `events` for `task_id`, dropping anything scheduled for it before.
    fn replace(&mut self, task_id: u64, events: Vec<ReminderEvent>) -> Result<(), NotifyError>;

    /// Drop every reminder scheduled for `task_id`.
    fn cancel(&mut self, task_id: u64) -> Result<(), NotifyError>;
}

/// What happened to a reminder whose fire time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Picked up within the grace window.
    Fired,
    /// Nothing ran until well after the fire time.
    Expired,
}

/// A reminder taken out of the outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub task_id: u64,
    pub event: ReminderEvent,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OutboxFile {
    #[serde(default)]
    scheduled: BTreeMap<u64, Vec<ReminderEvent>>,
}

/// A [`ReminderSink`] that keeps pending reminders in a JSON file.
#[derive(Debug)]
pub struct ReminderOutbox {
    path: PathBuf,
    file: OutboxFile,
}

impl ReminderOutbox {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, NotifyError> {
        let path = path.into();
        let file = load(&path)?;
        Ok(ReminderOutbox { path, file })
    }

    /// Pending reminders in firing order.
    pub fn pending(&self) -> Vec<(u64, &ReminderEvent)> {
        let mut out: Vec<_> = self
            .file
            .scheduled
            .iter()
            .flat_map(|(id, events)| events.iter().map(move |e| (*id, e)))
            .collect();
        out.sort_by_key(|(id, e)| (e.fire_at, *id));
        out
    }

    /// Pending reminders for one task.
    pub fn pending_for(&self, task_id: u64) -> &[ReminderEvent] {
        self.file.scheduled.get(&task_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Remove and return every reminder whose fire time is at or before `now`.
    ///
    /// Nothing is removed unless the outbox file could be rewritten.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<Delivered>, NotifyError> {
        let grace = Duration::minutes(EXPIRY_GRACE_MINUTES);
        let mut next = self.file.clone();
        let mut out = Vec::new();
        for (task_id, events) in next.scheduled.iter_mut() {
            let (due, keep): (Vec<_>, Vec<_>) = events.drain(..).partition(|e| e.fire_at <= now);
            *events = keep;
            out.extend(due.into_iter().map(|event| {
                let delivery = if now - event.fire_at > grace { Delivery::Expired } else { Delivery::Fired };
                Delivered { task_id: *task_id, event, delivery }
            }));
        }
        next.scheduled.retain(|_, events| !events.is_empty());
        if !out.is_empty() {
            save(&self.path, &next)?;
            self.file = next;
        }
        out.sort_by_key(|d| (d.event.fire_at, d.task_id));
        Ok(out)
    }

    /// Apply `change` to a copy of the schedule and adopt the copy once it
    /// is on disk.
    fn commit<T>(&mut self, change: impl FnOnce(&mut OutboxFile) -> T) -> Result<T, NotifyError> {
        let mut next = self.file.clone();
        let out = change(&mut next);
        save(&self.path, &next)?;
        self.file = next;
        Ok(out)
    }
}

fn save(path: &Path, file: &OutboxFile) -> Result<(), NotifyError> {
    let data = serde_json::to_string_pretty(file)
        .map_err(|source| NotifyError::Parse { path: path.to_path_buf(), source })?;
    write_atomic(path, data.as_bytes()).map_err(|source| NotifyError::Io { path: path.to_path_buf(), source })
}

fn load(path: &Path) -> Result<OutboxFile, NotifyError> {
    if !path.exists() {
        return Ok(OutboxFile::default());
    }
    let mut buf = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut buf))
        .map_err(|source| NotifyError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&buf).map_err(|source| NotifyError::Parse { path: path.to_path_buf(), source })
}

impl ReminderSink for ReminderOutbox {
    fn replace(&mut self, task_id: u64, events: Vec<ReminderEvent>) -> Result<(), NotifyError> {
        let previous = self.commit(|file| {
            if events.is_empty() {
                file.scheduled.remove(&task_id)
            } else {
                file.scheduled.insert(task_id, events)
            }
        })?;
        if let Some(previous) = previous {
            tracing::debug!(task_id, superseded = previous.len(), "replaced scheduled reminders");
        }
        Ok(())
    }

    fn cancel(&mut self, task_id: u64) -> Result<(), NotifyError> {
        if !self.file.scheduled.contains_key(&task_id) {
            return Ok(());
        }
        self.commit(|file| {
            file.scheduled.remove(&task_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::RepeatRule;
    use crate::reminder::plan;
    use crate::task::Task;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn events(id: u64, due_in: Duration) -> Vec<ReminderEvent> {
        let task = Task {
            id,
            name: format!("t{id}"),
            due: now() + due_in,
            all_day: false,
            repeat: RepeatRule::Off,
            color: None,
            owner: None,
        };
        plan(&task, true, now())
    }

    #[test]
    fn replace_does_not_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut outbox = ReminderOutbox::open(dir.path().join("reminders.json")).unwrap();
        outbox.replace(1, events(1, Duration::days(3))).unwrap();
        outbox.replace(1, events(1, Duration::days(3))).unwrap();
        outbox.replace(1, events(1, Duration::hours(3))).unwrap();
        assert_eq!(outbox.pending_for(1).len(), 2);
        assert_eq!(outbox.pending().len(), 2);

        outbox.replace(1, Vec::new()).unwrap();
        assert!(outbox.pending_for(1).is_empty());
    }

    #[test]
    fn cancel_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let mut outbox = ReminderOutbox::open(&path).unwrap();
        outbox.replace(1, events(1, Duration::days(3))).unwrap();
        outbox.replace(2, events(2, Duration::minutes(30))).unwrap();
        outbox.cancel(1).unwrap();
        outbox.cancel(42).unwrap();

        let reopened = ReminderOutbox::open(&path).unwrap();
        assert!(reopened.pending_for(1).is_empty());
        assert_eq!(reopened.pending_for(2).len(), 1);
    }

    #[test]
    fn take_due_splits_fired_and_expired() {
        let dir = tempfile::tempdir().unwrap();
        let mut outbox = ReminderOutbox::open(dir.path().join("reminders.json")).unwrap();
        // Fires at now+2d-24h, now+2d-1h, now+2d.
        outbox.replace(1, events(1, Duration::days(2))).unwrap();

        let later = now() + Duration::days(2) - Duration::minutes(30);
        let delivered = outbox.take_due(later).unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].delivery, Delivery::Expired);
        assert_eq!(delivered[1].delivery, Delivery::Fired);
        assert_eq!(delivered[1].event.title, "Hurry Up: t1");
        assert_eq!(outbox.pending_for(1).len(), 1);

        assert!(outbox.take_due(later).unwrap().is_empty());
    }

    #[test]
    fn failed_save_keeps_previous_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let mut outbox = ReminderOutbox::open(&path).unwrap();
        outbox.replace(1, events(1, Duration::days(2))).unwrap();

        let blocker = dir.path().join("reminders.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        assert!(outbox.replace(2, events(2, Duration::days(2))).is_err());
        assert!(outbox.cancel(1).is_err());
        assert!(outbox.take_due(now() + Duration::days(3)).is_err());
        assert!(outbox.pending_for(2).is_empty());
        assert_eq!(outbox.pending_for(1).len(), 3);
        std::fs::remove_dir(&blocker).unwrap();

        outbox.replace(3, events(3, Duration::days(2))).unwrap();
        let reopened = ReminderOutbox::open(&path).unwrap();
        assert!(reopened.pending_for(2).is_empty());
        assert_eq!(reopened.pending_for(1).len(), 3);
        assert_eq!(reopened.pending_for(3).len(), 3);
    }
}
