//! Task projection.
//!
//! Turns task snapshots into display rows. Projection is pure: when a
//! recurring task rolls over, the new anchor comes back as a
//! [`DueDateUpdateRequest`] for the caller to persist.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{EngineError, TaskValidationError};
use crate::recurrence::compute_effective;
use crate::remaining::describe;
use crate::task::{Task, TaskRecord};

/// A display row rebuilt from a [`Task`] on every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedTask {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub effective_due: DateTime<Utc>,
    pub formatted_date: String,
    pub time_remaining: String,
    pub repeat_display: String,
}

/// Instruction for the task store to move a task's anchor forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueDateUpdateRequest {
    pub task_id: u64,
    pub new_due: DateTime<Utc>,
}

/// A batch of projected tasks against one instant.
#[derive(Debug, Default)]
pub struct Projection {
    /// Sorted by effective due instant, then id.
    pub tasks: Vec<ProjectedTask>,
    pub updates: Vec<DueDateUpdateRequest>,
    /// Records that could not be projected, with the reason.
    pub skipped: Vec<SkippedRecord>,
}

/// A record left out of a batch.
#[derive(Debug)]
pub struct SkippedRecord {
    pub id: Option<u64>,
    pub reason: SkipReason,
}

#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error(transparent)]
    Invalid(#[from] TaskValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn row<Tz: TimeZone>(task: &Task, effective_due: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> ProjectedTask
where
    Tz::Offset: std::fmt::Display,
{
    let remaining = describe(now, effective_due, tz);
    ProjectedTask {
        id: task.id,
        name: task.name.clone(),
        color: task.display_color().to_string(),
        effective_due,
        formatted_date: remaining.formatted_date,
        time_remaining: remaining.label,
        repeat_display: task.repeat.display().to_string(),
    }
}

/// Project one task at `now`.
pub fn project<Tz: TimeZone>(
    task: &Task,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<(ProjectedTask, Option<DueDateUpdateRequest>), EngineError>
where
    Tz::Offset: std::fmt::Display,
{
    let effective = compute_effective(now, task.due, task.all_day, task.repeat, tz)?;
    let update = effective.advanced.then_some(DueDateUpdateRequest {
        task_id: task.id,
        new_due: effective.due,
    });
    Ok((row(task, effective.due, now, tz), update))
}

/// Project a task as it stands without rolling it over.
///
/// Used when an advancement could not be persisted, so the row keeps showing
/// the previous (overdue) occurrence.
pub fn project_stale<Tz: TimeZone>(task: &Task, now: DateTime<Utc>, tz: &Tz) -> Result<ProjectedTask, EngineError>
where
    Tz::Offset: std::fmt::Display,
{
    let target = if task.all_day {
        crate::recurrence::end_of_day(task.due, tz)?
    } else {
        task.due
    };
    Ok(row(task, target, now, tz))
}

/// Display ordering: ascending effective due, ties broken by id.
pub fn sort_projected(tasks: &mut [ProjectedTask]) {
    tasks.sort_by_key(|t| (t.effective_due, t.id));
}

/// Validate and project every record against one `now`.
///
/// Malformed records are skipped with a warning; the rest of the batch is
/// unaffected.
pub fn project_batch<'a, Tz, I>(records: I, now: DateTime<Utc>, tz: &Tz) -> Projection
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    I: IntoIterator<Item = &'a TaskRecord>,
{
    let mut out = Projection::default();
    for record in records {
        let projected = Task::try_from(record)
            .map_err(SkipReason::from)
            .and_then(|task| project(&task, now, tz).map_err(SkipReason::from));
        match projected {
            Ok((task, update)) => {
                out.tasks.push(task);
                out.updates.extend(update);
            }
            Err(reason) => {
                tracing::warn!(id = ?record.id, %reason, "skipping task record");
                out.skipped.push(SkippedRecord { id: record.id, reason });
            }
        }
    }
    sort_projected(&mut out.tasks);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::RepeatRule;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn task(id: u64, due: DateTime<Utc>, all_day: bool, repeat: RepeatRule) -> Task {
        Task {
            id,
            name: format!("task {id}"),
            due,
            all_day,
            repeat,
            color: Some("#009688".into()),
            owner: None,
        }
    }

    fn record(id: Option<u64>, due: Option<&str>) -> TaskRecord {
        TaskRecord {
            id,
            name: Some("r".into()),
            due: due.map(str::to_string),
            ..TaskRecord::default()
        }
    }

    #[test]
    fn past_one_off_task_is_overdue_without_update() {
        let now = at(2024, 6, 1, 0, 0);
        let t = task(1, at(2024, 5, 1, 0, 0), false, RepeatRule::Off);
        let (p, update) = project(&t, now, &Utc).unwrap();
        assert_eq!(p.time_remaining, "Overdue");
        assert_eq!(p.formatted_date, "");
        assert_eq!(p.repeat_display, "");
        assert!(update.is_none());
    }

    #[test]
    fn future_one_off_task_scenario() {
        let t = task(1, at(2024, 3, 1, 9, 0), false, RepeatRule::Off);
        let (p, update) = project(&t, at(2024, 2, 29, 9, 0), &Utc).unwrap();
        assert_eq!(p.time_remaining, "1 days left");
        assert_eq!(p.formatted_date, "Fri, Mar 1, 2024");
        assert_eq!(p.color, "#009688");
        assert!(update.is_none());
    }

    #[test]
    fn overdue_all_day_daily_task_emits_update() {
        let t = task(9, at(2024, 1, 15, 0, 0), true, RepeatRule::Daily);
        let (p, update) = project(&t, at(2024, 1, 20, 10, 0), &Utc).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 20)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap()
            .and_utc();
        assert_eq!(p.effective_due, expected);
        assert_eq!(p.time_remaining, "13 hours left");
        assert_eq!(p.repeat_display, "Daily");
        assert_eq!(update, Some(DueDateUpdateRequest { task_id: 9, new_due: expected }));
    }

    #[test]
    fn projection_is_idempotent() {
        let now = at(2024, 8, 3, 11, 0);
        let t = task(4, at(2022, 2, 28, 7, 0), false, RepeatRule::Monthly);
        assert_eq!(project(&t, now, &Utc).unwrap(), project(&t, now, &Utc).unwrap());
    }

    #[test]
    fn stale_projection_keeps_previous_occurrence() {
        let now = at(2024, 1, 20, 10, 0);
        let t = task(9, at(2024, 1, 15, 0, 0), true, RepeatRule::Daily);
        let p = project_stale(&t, now, &Utc).unwrap();
        assert_eq!(p.time_remaining, "Overdue");
        assert!(p.effective_due < now);
    }

    #[test]
    fn batch_skips_malformed_and_sorts() {
        let now = at(2024, 6, 1, 0, 0);
        let records = vec![
            record(Some(3), Some("2024-06-03T00:00:00Z")),
            record(None, Some("2024-06-02T00:00:00Z")),
            record(Some(2), None),
            record(Some(5), Some("not a date")),
            record(Some(1), Some("2024-06-03T00:00:00Z")),
            record(Some(4), Some("2024-06-02T00:00:00Z")),
        ];
        let batch = project_batch(&records, now, &Utc);
        assert_eq!(batch.tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![4, 1, 3]);
        assert_eq!(batch.skipped.len(), 3);
        assert!(batch.updates.is_empty());
    }

    #[test]
    fn batch_orders_by_effective_not_stored_due() {
        let now = at(2024, 6, 10, 12, 0);
        let mut weekly = TaskRecord::from_task(&task(1, at(2024, 1, 1, 9, 0), false, RepeatRule::Weekly), 0);
        weekly.id = Some(1);
        let soon = TaskRecord::from_task(&task(2, now + Duration::hours(2), false, RepeatRule::Off), 0);
        let batch = project_batch([&weekly, &soon], now, &Utc);
        assert_eq!(batch.tasks[0].id, 2);
        assert_eq!(batch.tasks[1].id, 1);
        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.updates[0].new_due, at(2024, 6, 17, 9, 0));
    }
}
