use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A task owned by a user, optionally recurring.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: u64,
    /// Short human readable title.
    pub title: String,
    /// Anchor date for recurrence math. A one-time task is due on exactly this day.
    pub start_date: NaiveDate,
    /// Last day of the series, if any.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// User who created the task.
    pub created_by_user_id: u64,
    /// User the task is assigned to, if any.
    #[serde(default)]
    pub assigned_user_id: Option<u64>,
    /// Timestamp when the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Whether `user_id` created or is assigned to this task.
    pub fn is_visible_to(&self, user_id: u64) -> bool {
        self.created_by_user_id == user_id || self.assigned_user_id == Some(user_id)
    }
}

/// Fields supplied by the caller when creating a task; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by_user_id: u64,
    pub assigned_user_id: Option<u64>,
}

/// Persisted recurrence kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringType {
    Daily,
    Weekly,
    /// Any kind this build does not know about. Never due.
    #[serde(other)]
    Unknown,
}

/// Recurrence record as stored, keyed by task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub task_id: u64,
    pub recurring_type: RecurringType,
    /// Number of skipped intervals between occurrences (0 = every interval).
    #[serde(default)]
    pub separation_count: u32,
    /// ISO weekday codes, 1 (Monday) to 7 (Sunday). Only read for weekly patterns.
    #[serde(default)]
    pub day_of_week: Option<Vec<u8>>,
}

impl RecurrencePattern {
    /// Converts the stored record into the rule the evaluator understands.
    ///
    /// Returns `None` for an unrecognised `recurring_type`.
    pub fn rule(&self) -> Option<Recurrence> {
        match self.recurring_type {
            RecurringType::Daily => Some(Recurrence::Daily {
                separation_count: self.separation_count,
            }),
            RecurringType::Weekly => Some(Recurrence::Weekly {
                separation_count: self.separation_count,
                days: self
                    .day_of_week
                    .as_deref()
                    .map(WeekdaySet::from_codes)
                    .unwrap_or_default(),
            }),
            RecurringType::Unknown => None,
        }
    }
}

/// A recurrence rule, carrying only the fields its kind needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Daily { separation_count: u32 },
    Weekly { separation_count: u32, days: WeekdaySet },
}

/// Set of ISO weekdays stored as a bitmask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Builds a set from ISO codes, ignoring anything outside `1..=7`.
    pub fn from_codes(codes: &[u8]) -> Self {
        let bits = codes
            .iter()
            .filter(|c| (1..=7).contains(*c))
            .fold(0u8, |acc, c| acc | 1 << (c - 1));
        WeekdaySet(bits)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// ISO codes in ascending order.
    pub fn codes(&self) -> Vec<u8> {
        (1..=7u8).filter(|c| self.0 & (1 << (c - 1)) != 0).collect()
    }
}

/// Record that the occurrence of a task on `instance_date` was done.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletedInstance {
    pub task_id: u64,
    /// When the completion was recorded.
    pub completed_at: DateTime<Utc>,
    /// Calendar date of the occurrence being marked complete.
    pub instance_date: NaiveDate,
}

/// A task together with its recurrence and the completion for the queried day.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DueTask {
    pub task: Task,
    pub recurrence: Option<RecurrencePattern>,
    pub completed: Option<CompletedInstance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(kind: RecurringType, days: Option<Vec<u8>>) -> RecurrencePattern {
        RecurrencePattern {
            task_id: 1,
            recurring_type: kind,
            separation_count: 2,
            day_of_week: days,
        }
    }

    #[test]
    fn weekday_set_drops_out_of_range_codes() {
        let set = WeekdaySet::from_codes(&[0, 1, 3, 8, 3]);
        assert_eq!(set.codes(), vec![1, 3]);
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Wed));
        assert!(!set.contains(Weekday::Sun));
    }

    #[test]
    fn sunday_is_code_seven() {
        let set = WeekdaySet::from_codes(&[7]);
        assert!(set.contains(Weekday::Sun));
        assert!(!set.contains(Weekday::Mon));
    }

    #[test]
    fn weekly_without_days_has_empty_set() {
        match pattern(RecurringType::Weekly, None).rule() {
            Some(Recurrence::Weekly { separation_count, days }) => {
                assert_eq!(separation_count, 2);
                assert!(days.is_empty());
            }
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_has_no_rule() {
        assert_eq!(pattern(RecurringType::Unknown, None).rule(), None);
    }

    #[test]
    fn unrecognised_kind_deserializes_as_unknown() {
        let json = r#"{"task_id":4,"recurring_type":"Monthly","separation_count":0}"#;
        let p: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(p.recurring_type, RecurringType::Unknown);
        assert_eq!(p.day_of_week, None);
    }

    #[test]
    fn visibility_covers_creator_and_assignee() {
        let task = Task {
            id: 1,
            title: "Water plants".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            created_by_user_id: 10,
            assigned_user_id: Some(20),
            created_at: Utc::now(),
        };
        assert!(task.is_visible_to(10));
        assert!(task.is_visible_to(20));
        assert!(!task.is_visible_to(30));
    }
}
