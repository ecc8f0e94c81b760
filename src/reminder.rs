//! Reminder planning.
//!
//! Derives the one-shot reminders for a task at creation or edit time. Planning
//! works on the stored due instant as entered: it ignores the all-day end of
//! day and never looks at recurrence rollover.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Which of the fixed offsets a reminder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
    AtDue,
}

impl ReminderKind {
    /// All kinds in the order they fire.
    pub const ALL: [ReminderKind; 3] = [ReminderKind::DayBefore, ReminderKind::HourBefore, ReminderKind::AtDue];

    /// How long before the due instant this reminder fires.
    pub fn lead(self) -> Duration {
        match self {
            ReminderKind::DayBefore => Duration::hours(24),
            ReminderKind::HourBefore => Duration::hours(1),
            ReminderKind::AtDue => Duration::zero(),
        }
    }

    fn title(self, name: &str) -> String {
        match self {
            ReminderKind::DayBefore => format!("Reminder: {name}"),
            ReminderKind::HourBefore => format!("Hurry Up: {name}"),
            ReminderKind::AtDue => format!("Task Due: {name}"),
        }
    }

    fn body(self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "Only 1 day left until your task is due!",
            ReminderKind::HourBefore => "Only 1 hour left until your task is due!",
            ReminderKind::AtDue => "Your task is now due. Make sure it's completed!",
        }
    }
}

/// A notification to schedule as a one-shot alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

/// Plan the reminders for `task` at `now`.
///
/// Returns nothing when notifications are off or the stored due instant is not
/// strictly in the future; otherwise the events whose fire time is still
/// ahead, in chronological order.
pub fn plan(task: &Task, notifications_enabled: bool, now: DateTime<Utc>) -> Vec<ReminderEvent> {
    if !notifications_enabled || task.due <= now {
        return Vec::new();
    }

    ReminderKind::ALL
        .iter()
        .filter_map(|&kind| {
            let fire_at = task.due.checked_sub_signed(kind.lead())?;
            (fire_at > now).then(|| ReminderEvent {
                kind,
                title: kind.title(&task.name),
                body: kind.body().to_string(),
                fire_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::RepeatRule;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn task_due_in(d: Duration) -> Task {
        Task {
            id: 1,
            name: "Dentist".into(),
            due: now() + d,
            all_day: false,
            repeat: RepeatRule::Off,
            color: None,
            owner: None,
        }
    }

    #[test]
    fn disabled_notifications_plan_nothing() {
        assert!(plan(&task_due_in(Duration::days(3)), false, now()).is_empty());
    }

    #[test]
    fn event_count_follows_lead_time() {
        let count = |d| plan(&task_due_in(d), true, now()).len();
        assert_eq!(count(Duration::days(2)), 3);
        assert_eq!(count(Duration::hours(24) + Duration::seconds(1)), 3);
        assert_eq!(count(Duration::hours(24)), 2);
        assert_eq!(count(Duration::hours(5)), 2);
        assert_eq!(count(Duration::hours(1)), 1);
        assert_eq!(count(Duration::minutes(30)), 1);
        assert_eq!(count(Duration::zero()), 0);
        assert_eq!(count(Duration::hours(-3)), 0);
    }

    #[test]
    fn events_are_chronological_with_expected_text() {
        let task = task_due_in(Duration::days(2));
        let events = plan(&task, true, now());
        assert_eq!(
            events.iter().map(|e| e.kind).collect::<Vec<_>>(),
            ReminderKind::ALL.to_vec()
        );
        assert_eq!(events[0].fire_at, task.due - Duration::hours(24));
        assert_eq!(events[0].title, "Reminder: Dentist");
        assert_eq!(events[0].body, "Only 1 day left until your task is due!");
        assert_eq!(events[1].fire_at, task.due - Duration::hours(1));
        assert_eq!(events[1].title, "Hurry Up: Dentist");
        assert_eq!(events[2].fire_at, task.due);
        assert_eq!(events[2].title, "Task Due: Dentist");
        assert_eq!(events[2].body, "Your task is now due. Make sure it's completed!");
        assert!(events.windows(2).all(|w| w[0].fire_at < w[1].fire_at));
    }

    #[test]
    fn never_plans_into_the_past() {
        for minutes in [-90, -1, 0, 1, 59, 60, 61, 1439, 1440, 1441, 5000] {
            let events = plan(&task_due_in(Duration::minutes(minutes)), true, now());
            assert!(events.iter().all(|e| e.fire_at > now()), "{minutes}");
        }
    }

    #[test]
    fn uses_raw_due_for_all_day_tasks() {
        let mut task = task_due_in(Duration::minutes(-5));
        task.all_day = true;
        task.repeat = RepeatRule::Daily;
        assert!(plan(&task, true, now()).is_empty());
    }
}
