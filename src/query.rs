use chrono::NaiveDate;
use tracing::{debug, info};
use crate::clock::Clock;
use crate::due::is_due;
use crate::models::DueTask;
use crate::storage::{StoreError, TaskStore};

/// Tasks visible to `user_id` that are due on `date`.
///
/// The clock is read once per call. Rows keep the store's order (task id ascending).
/// Store failures are returned unchanged; an empty list is a normal result.
pub fn due_tasks<S, C>(
    store: &S,
    clock: &C,
    date: NaiveDate,
    user_id: u64,
) -> Result<Vec<DueTask>, StoreError>
where
    S: TaskStore + ?Sized,
    C: Clock + ?Sized,
{
    let now = clock.now();
    let candidates = store.due_candidates(user_id, date)?;
    let total = candidates.len();

    let due: Vec<DueTask> = candidates
        .into_iter()
        .filter(|row| {
            let verdict = is_due(
                &row.task,
                row.recurrence.as_ref(),
                row.completed.as_ref(),
                date,
                now,
            );
            debug!(task_id = row.task.id, %date, due = verdict, "evaluated");
            verdict
        })
        .collect();

    info!(user_id, %date, candidates = total, due = due.len(), "due tasks query");
    Ok(due)
}

/// A store and clock bundled for repeated queries.
pub struct DueTaskQuery<S, C> {
    store: S,
    clock: C,
}

impl<S: TaskStore, C: Clock> DueTaskQuery<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run(&self, date: NaiveDate, user_id: u64) -> Result<Vec<DueTask>, StoreError> {
        due_tasks(&self.store, &self.clock, date, user_id)
    }
}
