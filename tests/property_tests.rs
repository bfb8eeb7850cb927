//! Property tests for the evaluator and the due-task query.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use dueday::clock::FixedClock;
use dueday::due::is_due;
use dueday::models::{CompletedInstance, NewTask, RecurrencePattern, RecurringType};
use dueday::query::{due_tasks, DueTaskQuery};
use dueday::storage::{MemoryStore, Tables};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn day(offset: i64) -> NaiveDate {
    base() + Duration::days(offset)
}

fn noon(offset: i64) -> NaiveDateTime {
    day(offset).and_hms_opt(12, 0, 0).unwrap()
}

fn arb_pattern() -> impl Strategy<Value = Option<RecurrencePattern>> {
    prop_oneof![
        Just(None),
        (0u32..6).prop_map(|s| Some(RecurrencePattern {
            task_id: 0,
            recurring_type: RecurringType::Daily,
            separation_count: s,
            day_of_week: None,
        })),
        (0u32..4, prop::collection::vec(1u8..=7, 0..5)).prop_map(|(s, days)| Some(
            RecurrencePattern {
                task_id: 0,
                recurring_type: RecurringType::Weekly,
                separation_count: s,
                day_of_week: Some(days),
            }
        )),
    ]
}

fn build_store(specs: &[(u64, Option<u64>, i64, Option<RecurrencePattern>)]) -> MemoryStore {
    let mut tables = Tables::default();
    for (i, (owner, assignee, start, pattern)) in specs.iter().enumerate() {
        tables.add_task(
            NewTask {
                title: format!("task {}", i),
                start_date: day(*start),
                end_date: None,
                created_by_user_id: *owner,
                assigned_user_id: *assignee,
            },
            pattern.clone(),
        );
    }
    MemoryStore::new(tables)
}

fn arb_specs() -> impl Strategy<Value = Vec<(u64, Option<u64>, i64, Option<RecurrencePattern>)>> {
    prop::collection::vec(
        (1u64..4, prop::option::of(1u64..4), -30i64..30, arb_pattern()),
        0..12,
    )
}

proptest! {
    #[test]
    fn one_time_due_only_on_start(start in -400i64..400, query in -400i64..400, now in -400i64..400) {
        let mut tables = Tables::default();
        let task = tables.add_task(
            NewTask {
                title: "once".into(),
                start_date: day(start),
                end_date: None,
                created_by_user_id: 1,
                assigned_user_id: None,
            },
            None,
        );
        prop_assert_eq!(is_due(&task, None, None, day(query), noon(now)), start == query);
    }

    #[test]
    fn daily_every_day_always_due(start in -400i64..400, query in -400i64..400) {
        let mut tables = Tables::default();
        let pattern = RecurrencePattern {
            task_id: 0,
            recurring_type: RecurringType::Daily,
            separation_count: 0,
            day_of_week: None,
        };
        let task = tables.add_task(
            NewTask {
                title: "daily".into(),
                start_date: day(start),
                end_date: None,
                created_by_user_id: 1,
                assigned_user_id: None,
            },
            Some(pattern.clone()),
        );
        prop_assert!(is_due(&task, Some(&pattern), None, day(query), noon(1000)));
    }

    #[test]
    fn completion_only_affects_its_own_future_date(
        pattern in arb_pattern(),
        start in -30i64..30,
        completed_on in 0i64..60,
        query in 0i64..60,
    ) {
        prop_assume!(query != completed_on);
        let before = build_store(&[(1, None, start, pattern.clone())]);
        let mut after = before.clone();
        after
            .tables
            .insert_completion(CompletedInstance {
                task_id: 1,
                completed_at: Utc::now(),
                instance_date: day(completed_on),
            })
            .unwrap();
        let clock = FixedClock(noon(-1));

        let ids = |store: &MemoryStore, q: i64| -> Vec<u64> {
            due_tasks(store, &clock, day(q), 1).unwrap().iter().map(|r| r.task.id).collect()
        };
        prop_assert_eq!(ids(&before, query), ids(&after, query));
        prop_assert_eq!(ids(&after, completed_on), vec![1]);
    }

    #[test]
    fn due_tasks_is_filter_of_visible_candidates(
        specs in arb_specs(),
        user in 1u64..4,
        query in -40i64..40,
        now in -40i64..40,
    ) {
        let store = build_store(&specs);
        let clock = FixedClock(noon(now));
        let result = due_tasks(&store, &clock, day(query), user).unwrap();

        let expected: BTreeSet<u64> = store
            .tables
            .tasks
            .iter()
            .filter(|t| t.is_visible_to(user))
            .filter(|t| {
                let pattern = store.tables.patterns.iter().find(|p| p.task_id == t.id);
                is_due(t, pattern, None, day(query), noon(now))
            })
            .map(|t| t.id)
            .collect();
        let got: BTreeSet<u64> = result.iter().map(|r| r.task.id).collect();
        prop_assert_eq!(got, expected);

        let ids: Vec<u64> = result.iter().map(|r| r.task.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        prop_assert_eq!(ids, sorted);
    }

    #[test]
    fn due_tasks_is_idempotent(specs in arb_specs(), user in 1u64..4, query in -40i64..40) {
        let query_runner = DueTaskQuery::new(build_store(&specs), FixedClock(noon(0)));
        let first = query_runner.run(day(query), user).unwrap();
        let second = query_runner.run(day(query), user).unwrap();
        prop_assert_eq!(first, second);
    }
}
