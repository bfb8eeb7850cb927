//! Recurrence evaluation for tasks: decides whether a task has a due occurrence
//! on a given calendar day, and lists the tasks due for a user on that day.
//!
//! [`due::is_due`] is a pure function of the task, its optional recurrence pattern,
//! the completion recorded for the queried day, the day itself and "now".
//! [`query::due_tasks`] runs that predicate over the candidates a
//! [`storage::TaskStore`] returns for a user.

pub mod clock;
pub mod commands;
pub mod config;
pub mod due;
pub mod models;
pub mod query;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use due::is_due;
pub use models::{CompletedInstance, DueTask, Recurrence, RecurrencePattern, RecurringType, Task};
pub use query::{due_tasks, DueTaskQuery};
pub use storage::{JsonStore, MemoryStore, StoreError, Tables, TaskStore};
