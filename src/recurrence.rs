//! Recurrence calculation.
//!
//! Works out the instant a task is effectively due at, rolling recurring
//! tasks forward by whole periods until they sit in the future again. Calendar
//! arithmetic (end of day, months, years) happens in the caller's time zone so
//! that "end of day" and "same day next month" mean what the user sees.

use chrono::{DateTime, Days, Duration, Months, NaiveDateTime, TimeZone, Utc};

use crate::error::EngineError;
use crate::fields::RepeatRule;

/// Result of [`compute_effective`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effective {
    pub due: DateTime<Utc>,
    /// Whether the stored anchor was rolled forward to reach `due`.
    pub advanced: bool,
}

/// Last representable millisecond of the local day containing `at`.
pub fn end_of_day<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>, EngineError> {
    let naive = end_of_day_local(at, tz)?;
    resolve_local(tz, naive).ok_or_else(|| EngineError::OutOfRange(at.to_string()))
}

fn end_of_day_local<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> Result<NaiveDateTime, EngineError> {
    at.with_timezone(tz)
        .date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| EngineError::OutOfRange(at.to_string()))
}

/// Map a local wall-clock time back to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap move forward by an hour.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
}

/// The anchor moved forward by `k` whole periods of `rule`.
fn nth_occurrence(anchor: NaiveDateTime, rule: RepeatRule, k: u32) -> Option<NaiveDateTime> {
    match rule {
        RepeatRule::Off => Some(anchor),
        RepeatRule::Daily => anchor.checked_add_days(Days::new(u64::from(k))),
        RepeatRule::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(k))),
        // Months clamp an overflowing day to the last day of the target month.
        RepeatRule::Monthly => anchor.checked_add_months(Months::new(k)),
        RepeatRule::Yearly => anchor.checked_add_months(Months::new(k.checked_mul(12)?)),
    }
}

/// Compute the effective due instant of a task at `now`.
///
/// Non-recurring tasks are returned as-is even when in the past. Recurring
/// tasks whose target has passed are moved forward by whole periods, counted
/// from the stored anchor, until strictly after `now`.
///
/// # Errors
/// Returns [`EngineError::OutOfRange`] when advancing would leave the
/// representable calendar range.
pub fn compute_effective<Tz: TimeZone>(
    now: DateTime<Utc>,
    due: DateTime<Utc>,
    all_day: bool,
    repeat: RepeatRule,
    tz: &Tz,
) -> Result<Effective, EngineError> {
    let target = if all_day { end_of_day(due, tz)? } else { due };

    if !repeat.is_recurring() || target > now {
        return Ok(Effective { due: target, advanced: false });
    }

    let anchor = if all_day {
        end_of_day_local(due, tz)?
    } else {
        due.with_timezone(tz).naive_local()
    };
    let out_of_range = || EngineError::OutOfRange(due.to_string());

    let mut k: u32 = 0;
    loop {
        k = k.checked_add(1).ok_or_else(out_of_range)?;
        let candidate = nth_occurrence(anchor, repeat, k)
            .and_then(|naive| resolve_local(tz, naive))
            .ok_or_else(out_of_range)?;
        if candidate > now {
            tracing::debug!(periods = k, %due, next = %candidate, ?repeat, "advanced recurring task");
            return Ok(Effective { due: candidate, advanced: true });
        }
    }
}
