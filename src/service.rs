//! Calling flows around the engine.
//!
//! These functions own the side effects the engine only describes: applying
//! due-date advancements to the store and handing planned reminders to the
//! reminder sink. Collaborator failures are reported, never retried.

use chrono::{DateTime, TimeZone, Utc};

use crate::config::Settings;
use crate::db::{local_instant, NewTask, TaskStore};
use crate::error::{NotifyError, Result, StoreError};
use crate::fields::RepeatRule;
use crate::notify::ReminderSink;
use crate::projector::{project_batch, project_stale, sort_projected, DueDateUpdateRequest, ProjectedTask};
use crate::reminder::{plan, ReminderEvent};
use crate::task::{validate_name, Task, TaskRecord};

/// Result of a refresh pass.
#[derive(Debug, Default)]
pub struct Refreshed {
    /// Display rows in display order.
    pub tasks: Vec<ProjectedTask>,
    /// Advancements written to the store.
    pub applied: Vec<DueDateUpdateRequest>,
    /// Advancements the store rejected; those rows show the previous occurrence.
    pub failed: Vec<(DueDateUpdateRequest, StoreError)>,
    /// Records skipped as malformed.
    pub skipped: usize,
    /// Tasks whose reminders were re-planned after rolling over.
    pub replanned: usize,
}

/// Project every task of the current owner and persist rollovers.
pub fn refresh<S, N, Tz>(store: &mut S, sink: &mut N, settings: &Settings, now: DateTime<Utc>, tz: &Tz) -> Refreshed
where
    S: TaskStore,
    N: ReminderSink,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let records = store.records(Some(&settings.owner));
    let projection = project_batch(&records, now, tz);
    let mut out = Refreshed {
        tasks: projection.tasks,
        skipped: projection.skipped.len(),
        ..Refreshed::default()
    };

    for update in projection.updates {
        let Some(task) = find_task(&records, update.task_id) else {
            continue;
        };
        match store.apply_due_update(&update, now) {
            Ok(()) => {
                tracing::info!(task_id = update.task_id, new_due = %update.new_due, "advanced recurring task");
                if settings.replan_on_rollover && settings.notifications_enabled {
                    let events = plan(&task.with_due(replan_anchor(&task, update.new_due, tz)), true, now);
                    match sink.replace(task.id, events) {
                        Ok(()) => out.replanned += 1,
                        Err(e) => tracing::warn!(task_id = task.id, error = %e, "failed to re-plan reminders"),
                    }
                }
                out.applied.push(update);
            }
            Err(e) => {
                tracing::warn!(task_id = update.task_id, error = %e, "failed to persist due date advancement");
                match project_stale(&task, now, tz) {
                    Ok(stale) => {
                        if let Some(row) = out.tasks.iter_mut().find(|t| t.id == task.id) {
                            *row = stale;
                        }
                    }
                    Err(err) => tracing::warn!(task_id = task.id, error = %err, "cannot render previous occurrence"),
                }
                out.failed.push((update, e));
            }
        }
    }

    sort_projected(&mut out.tasks);
    out
}

/// The instant to plan reminders against after a rollover.
///
/// An advanced all-day task sits at the end of its day; reminders keep the
/// stored time of day instead, the same as when the task was created.
fn replan_anchor<Tz: TimeZone>(task: &Task, new_due: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    if !task.all_day {
        return new_due;
    }
    let date = new_due.with_timezone(tz).date_naive();
    let time = task.due.with_timezone(tz).time();
    local_instant(date, time, tz).unwrap_or(new_due)
}

fn find_task(records: &[TaskRecord], id: u64) -> Option<Task> {
    records
        .iter()
        .find(|r| r.id == Some(id))
        .and_then(|r| Task::try_from(r).ok())
}

/// A task that was written, with the reminders scheduled for it.
#[derive(Debug)]
pub struct Saved {
    pub task: Task,
    pub reminders: Vec<ReminderEvent>,
    /// Set when scheduling failed; the write itself still went through.
    pub reminder_error: Option<NotifyError>,
}

/// Plan reminders for a freshly written task and hand them to the sink.
///
/// With notifications disabled the sink is left untouched.
fn schedule<N: ReminderSink>(sink: &mut N, settings: &Settings, task: Task, now: DateTime<Utc>) -> Saved {
    if !settings.notifications_enabled {
        return Saved { task, reminders: Vec::new(), reminder_error: None };
    }
    let reminders = plan(&task, true, now);
    let reminder_error = sink.replace(task.id, reminders.clone()).err();
    if let Some(e) = &reminder_error {
        tracing::warn!(task_id = task.id, error = %e, "failed to schedule reminders");
    }
    Saved { task, reminders, reminder_error }
}

/// Validate and store a new task, then schedule its reminders.
pub fn create_task<S: TaskStore, N: ReminderSink>(
    store: &mut S,
    sink: &mut N,
    settings: &Settings,
    mut new: NewTask,
    now: DateTime<Utc>,
) -> Result<Saved> {
    new.name = validate_name(&new.name)?;
    if new.owner.is_none() {
        new.owner = Some(settings.owner.clone());
    }
    let task = store.insert(new, now)?;
    tracing::info!(task_id = task.id, due = %task.due, "task created");
    Ok(schedule(sink, settings, task, now))
}

/// Changes to apply to an existing task; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    /// New anchor and all-day flag.
    pub due: Option<(DateTime<Utc>, bool)>,
    pub repeat: Option<RepeatRule>,
    pub color: Option<String>,
}

impl TaskEdit {
    fn apply(self, mut task: Task) -> Result<Task> {
        if let Some(name) = self.name {
            task.name = validate_name(&name)?;
        }
        if let Some((due, all_day)) = self.due {
            task.due = due;
            task.all_day = all_day;
        }
        if let Some(repeat) = self.repeat {
            task.repeat = repeat;
        }
        if let Some(color) = self.color {
            task.color = Some(color);
        }
        Ok(task)
    }
}

/// Apply an edit to a stored task, then re-plan its reminders.
pub fn edit_task<S: TaskStore, N: ReminderSink>(
    store: &mut S,
    sink: &mut N,
    settings: &Settings,
    id: u64,
    edit: TaskEdit,
    now: DateTime<Utc>,
) -> Result<Saved> {
    let record = store.record(id).ok_or(StoreError::NotFound(id))?;
    let task = edit.apply(Task::try_from(&record)?)?;
    store.update(&task, now)?;
    tracing::info!(task_id = task.id, due = %task.due, "task updated");
    Ok(schedule(sink, settings, task, now))
}

/// Delete a task and cancel its reminders.
///
/// Returns the cancellation failure, if any; the delete itself has happened.
pub fn delete_task<S: TaskStore, N: ReminderSink>(store: &mut S, sink: &mut N, id: u64) -> Result<Option<NotifyError>> {
    store.remove(id)?;
    tracing::info!(task_id = id, "task deleted");
    Ok(sink.cancel(id).err().inspect(|e| {
        tracing::warn!(task_id = id, error = %e, "failed to cancel reminders");
    }))
}
