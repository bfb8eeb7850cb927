use chrono::{Datelike, NaiveDate, NaiveDateTime};
use crate::models::{CompletedInstance, Recurrence, RecurrencePattern, Task};

/// Decides whether `task` has an occurrence due on `date`.
///
/// Evaluated in order:
/// - **Completion override**: if `date` lies after `now` and a completion record is given,
///   the task is due only when that record's instance date is `date`.
/// - **One-time**: without a pattern, the task is due on its start date only.
/// - **Daily**: due every `separation_count + 1` days counted from the start date.
/// - **Weekly**: the weekday must be in the pattern's set, and the day offset from the
///   start date must be a multiple of `separation_count * 7 + 1`.
///
/// Unrecognised patterns are never due. This function has no side effects.
pub fn is_due(
    task: &Task,
    pattern: Option<&RecurrencePattern>,
    completed: Option<&CompletedInstance>,
    date: NaiveDate,
    now: NaiveDateTime,
) -> bool {
    if is_future(date, now) {
        if let Some(done) = completed {
            return done.instance_date == date;
        }
    }

    let Some(pattern) = pattern else {
        return task.start_date == date;
    };

    match pattern.rule() {
        Some(rule) => rule_matches(&rule, task.start_date, date),
        None => false,
    }
}

/// Applies a recurrence rule anchored at `start` to `date`.
pub fn rule_matches(rule: &Recurrence, start: NaiveDate, date: NaiveDate) -> bool {
    match *rule {
        Recurrence::Daily { separation_count: 0 } => true,
        Recurrence::Daily { separation_count } => {
            matches_interval(start, date, i64::from(separation_count))
        }
        Recurrence::Weekly { separation_count, days } => {
            if !days.contains(date.weekday()) {
                return false;
            }
            matches_interval(start, date, i64::from(separation_count) * 7)
        }
    }
}

/// Local midnight of `date` is later than `now`, i.e. `date` is after today.
fn is_future(date: NaiveDate, now: NaiveDateTime) -> bool {
    date > now.date()
}

/// ISO weekday, 1 = Monday through 7 = Sunday.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Whole days from `a` to `b`; negative when `b` precedes `a`.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// `date` sits on a multiple of `interval + 1` days from `start`, in either direction.
pub fn matches_interval(start: NaiveDate, date: NaiveDate, interval: i64) -> bool {
    days_between(start, date).rem_euclid(interval + 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn iso_weekday_numbers() {
        assert_eq!(iso_weekday(d(2024, 1, 1)), 1); // Monday
        assert_eq!(iso_weekday(d(2024, 1, 7)), 7); // Sunday
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(d(2024, 1, 1), d(2024, 1, 11)), 10);
        assert_eq!(days_between(d(2024, 1, 11), d(2024, 1, 1)), -10);
        assert_eq!(days_between(d(2024, 2, 28), d(2024, 3, 1)), 2);
    }

    #[test]
    fn matches_interval_before_start() {
        assert!(matches_interval(d(2024, 1, 10), d(2024, 1, 6), 1));
        assert!(!matches_interval(d(2024, 1, 10), d(2024, 1, 7), 1));
    }

    #[test]
    fn future_is_strictly_after_today() {
        let now = d(2024, 1, 10).and_hms_opt(23, 59, 59).unwrap();
        assert!(!is_future(d(2024, 1, 10), now));
        assert!(is_future(d(2024, 1, 11), now));
        assert!(!is_future(d(2024, 1, 9), now));
    }
}
