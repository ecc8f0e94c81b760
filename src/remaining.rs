//! Time-remaining and calendar labels.

use chrono::{DateTime, TimeZone, Utc};

/// Label shown once the effective due instant has passed.
pub const OVERDUE: &str = "Overdue";

/// Coarse remaining-time label and calendar label for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remaining {
    pub label: String,
    /// Empty when overdue.
    pub formatted_date: String,
}

impl Remaining {
    pub fn is_overdue(&self) -> bool {
        self.label == OVERDUE
    }
}

/// Render how long is left from `now` until `target`.
///
/// Only the coarsest nonzero unit of days, hours, minutes is shown; a target
/// less than a minute away reads "0 minutes left".
pub fn time_remaining(now: DateTime<Utc>, target: DateTime<Utc>) -> String {
    let diff = target - now;
    if diff <= chrono::Duration::zero() {
        return OVERDUE.to_string();
    }
    let days = diff.num_days();
    let hours = diff.num_hours() % 24;
    let minutes = diff.num_minutes() % 60;

    if days > 0 {
        format!("{days} days left")
    } else if hours > 0 {
        format!("{hours} hours left")
    } else {
        format!("{minutes} minutes left")
    }
}

/// Short calendar label in `tz`, e.g. "Fri, Mar 1, 2024".
pub fn format_date<Tz: TimeZone>(target: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    target.with_timezone(tz).format("%a, %b %-d, %Y").to_string()
}

/// Both labels for a target; the date is blank when overdue.
pub fn describe<Tz: TimeZone>(now: DateTime<Utc>, target: DateTime<Utc>, tz: &Tz) -> Remaining
where
    Tz::Offset: std::fmt::Display,
{
    let label = time_remaining(now, target);
    let formatted_date = if label == OVERDUE {
        String::new()
    } else {
        format_date(target, tz)
    };
    Remaining { label, formatted_date }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn coarsest_unit_wins() {
        let now = at(2024, 5, 1, 12, 0);
        let target = now + Duration::days(3) + Duration::hours(5) + Duration::minutes(7);
        assert_eq!(time_remaining(now, target), "3 days left");
        assert_eq!(time_remaining(now, now + Duration::hours(5) + Duration::minutes(7)), "5 hours left");
        assert_eq!(time_remaining(now, now + Duration::minutes(7)), "7 minutes left");
        assert_eq!(time_remaining(now, now + Duration::days(1)), "1 days left");
    }

    #[test]
    fn under_a_minute_reads_zero_minutes() {
        let now = at(2024, 5, 1, 12, 0);
        assert_eq!(time_remaining(now, now + Duration::seconds(59)), "0 minutes left");
        assert_eq!(time_remaining(now, now + Duration::milliseconds(1)), "0 minutes left");
    }

    #[test]
    fn zero_or_negative_is_overdue() {
        let now = at(2024, 5, 1, 12, 0);
        assert_eq!(time_remaining(now, now), OVERDUE);
        assert_eq!(time_remaining(now, now - Duration::days(2)), OVERDUE);
    }

    #[test]
    fn hours_are_reduced_modulo_a_day() {
        let now = at(2024, 5, 1, 12, 0);
        assert_eq!(time_remaining(now, now + Duration::hours(23) + Duration::minutes(59)), "23 hours left");
        assert_eq!(time_remaining(now, now + Duration::minutes(60)), "1 hours left");
    }

    #[test]
    fn describes_leap_day_scenario() {
        let target = at(2024, 3, 1, 9, 0);
        let r = describe(at(2024, 2, 29, 9, 0), target, &Utc);
        assert_eq!(r.label, "1 days left");
        assert_eq!(r.formatted_date, "Fri, Mar 1, 2024");

        // 2024 is a leap year: Feb 28 to Mar 1 spans two whole days.
        let r = describe(at(2024, 2, 28, 9, 0), target, &Utc);
        assert_eq!(r.label, "2 days left");
        assert!(!r.is_overdue());
    }

    #[test]
    fn overdue_has_blank_date() {
        let now = at(2024, 5, 1, 12, 0);
        let r = describe(now, now - Duration::minutes(1), &Utc);
        assert!(r.is_overdue());
        assert_eq!(r.formatted_date, "");
    }

    #[test]
    fn date_uses_local_zone() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(format_date(at(2024, 3, 1, 2, 0), &tz), "Thu, Feb 29, 2024");
    }
}
