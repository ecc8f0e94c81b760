use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use countdown_tracker::{compute_effective, plan, project, RepeatRule, Task};

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn task(due: DateTime<Utc>, all_day: bool, repeat: RepeatRule) -> Task {
    Task {
        id: 1,
        name: "Quarterly report".to_string(),
        due,
        all_day,
        repeat,
        color: None,
        owner: Some("local".to_string()),
    }
}

const RULES: [RepeatRule; 4] = [RepeatRule::Daily, RepeatRule::Weekly, RepeatRule::Monthly, RepeatRule::Yearly];

#[test]
fn one_off_tasks_in_the_past_are_overdue() {
    let now = at("2024-06-01T12:00:00Z");
    for offset in [0, 1, 60, 60 * 24, 60 * 24 * 400] {
        for all_day in [false, true] {
            let due = now - Duration::minutes(offset) - Duration::days(i64::from(all_day));
            let (row, update) = project(&task(due, all_day, RepeatRule::Off), now, &Utc).unwrap();
            assert_eq!(row.time_remaining, "Overdue", "offset {offset} all_day {all_day}");
            assert_eq!(row.formatted_date, "");
            assert!(update.is_none());
        }
    }
}

#[test]
fn recurring_tasks_land_after_now_by_whole_periods() {
    let now = at("2025-03-15T08:30:00Z");
    let anchors = ["2025-03-15T08:30:00Z", "2024-12-31T23:00:00Z", "2020-02-29T06:00:00Z", "2025-01-31T12:00:00Z"];
    for anchor in anchors.map(at) {
        for rule in RULES {
            let eff = compute_effective(now, anchor, false, rule, &Utc).unwrap();
            assert!(eff.due > now, "{anchor} {rule:?}");
            assert!(eff.advanced);
            assert_eq!(eff.due.time(), anchor.time());
            match rule {
                RepeatRule::Daily => assert_eq!((eff.due - anchor).num_seconds() % 86_400, 0),
                RepeatRule::Weekly => assert_eq!((eff.due - anchor).num_seconds() % (7 * 86_400), 0),
                _ => {}
            }
        }
    }
}

#[test]
fn monthly_jan_31_goes_to_end_of_february() {
    let leap = compute_effective(at("2024-02-01T00:00:00Z"), at("2024-01-31T10:00:00Z"), false, RepeatRule::Monthly, &Utc).unwrap();
    assert_eq!(leap.due, at("2024-02-29T10:00:00Z"));
    let common = compute_effective(at("2025-02-01T00:00:00Z"), at("2025-01-31T10:00:00Z"), false, RepeatRule::Monthly, &Utc).unwrap();
    assert_eq!(common.due, at("2025-02-28T10:00:00Z"));
}

#[test]
fn projecting_twice_gives_the_same_answer() {
    let now = at("2024-09-09T09:09:09Z");
    for rule in RULES {
        let t = task(at("2023-01-01T00:00:00Z"), true, rule);
        assert_eq!(project(&t, now, &Utc).unwrap(), project(&t, now, &Utc).unwrap());
    }
}

#[test]
fn countdown_label_and_calendar_label() {
    let t = task(at("2024-03-01T09:00:00Z"), false, RepeatRule::Off);
    let (row, _) = project(&t, at("2024-02-29T09:00:00Z"), &Utc).unwrap();
    assert_eq!(row.time_remaining, "1 days left");
    assert_eq!(row.formatted_date, "Fri, Mar 1, 2024");
}

#[test]
fn all_day_daily_rollover_scenario() {
    let t = task(at("2024-01-15T00:00:00Z"), true, RepeatRule::Daily);
    let (row, update) = project(&t, at("2024-01-20T10:00:00Z"), &Utc).unwrap();
    let expected = NaiveDate::from_ymd_opt(2024, 1, 20)
        .unwrap()
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap()
        .and_utc();
    assert_eq!(row.effective_due, expected);
    assert_eq!(row.repeat_display, "Daily");
    let update = update.expect("rollover emits an update");
    assert_eq!(update.task_id, 1);
    assert_eq!(update.new_due, expected);
}

#[test]
fn reminder_counts_by_lead_time() {
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
    let count = |due_in: Duration| plan(&task(now + due_in, false, RepeatRule::Off), true, now).len();
    assert_eq!(count(Duration::days(2)), 3);
    assert_eq!(count(Duration::hours(12)), 2);
    assert_eq!(count(Duration::minutes(20)), 1);
    assert_eq!(count(Duration::minutes(-20)), 0);
}

#[test]
fn disabled_notifications_never_plan() {
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
    for hours in [-48, -1, 0, 1, 5, 30, 1000] {
        for rule in RULES {
            let t = task(now + Duration::hours(hours), hours % 2 == 0, rule);
            assert!(plan(&t, false, now).is_empty());
            assert!(plan(&t, true, now).iter().all(|e| e.fire_at > now));
        }
    }
}
