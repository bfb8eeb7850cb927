use std::io::{self, Write};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use crate::clock::Clock;
use crate::due::is_due;
use crate::models::{
    CompletedInstance, DueTask, NewTask, Recurrence, RecurrencePattern, RecurringType, Task,
};
use crate::query::due_tasks;
use crate::storage::{JsonStore, StoreError};

/// Errors reported by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid date '{input}': {source}. Use YYYY-MM-DD.")]
    InvalidDate {
        input: String,
        source: chrono::ParseError,
    },
    #[error("invalid timestamp '{input}': {source}. Use YYYY-MM-DDTHH:MM:SS.")]
    InvalidTimestamp {
        input: String,
        source: chrono::ParseError,
    },
    #[error("unknown recurrence '{0}'. Supported: daily, weekly.")]
    UnknownRecurrence(String),
    #[error("task {0} not found")]
    TaskNotFound(u64),
    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] io::Error),
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|source| CommandError::InvalidDate {
        input: input.to_string(),
        source,
    })
}

/// Parses a `YYYY-MM-DDTHH:MM:SS` local timestamp.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime, CommandError> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S").map_err(|source| {
        CommandError::InvalidTimestamp {
            input: input.to_string(),
            source,
        }
    })
}

/// Builds a pattern from the `--recur`, `--every` and `--days` flags.
///
/// `every` is the separation count: 0 repeats every interval, 1 every other one.
pub fn parse_recurrence(
    recur: Option<&str>,
    every: u32,
    days: &[u8],
) -> Result<Option<RecurrencePattern>, CommandError> {
    let Some(kind) = recur else {
        return Ok(None);
    };
    let recurring_type = match kind.to_lowercase().as_str() {
        "daily" => RecurringType::Daily,
        "weekly" => RecurringType::Weekly,
        _ => return Err(CommandError::UnknownRecurrence(kind.to_string())),
    };
    let day_of_week = match recurring_type {
        RecurringType::Weekly => Some(days.to_vec()),
        _ => None,
    };
    Ok(Some(RecurrencePattern {
        task_id: 0,
        recurring_type,
        separation_count: every,
        day_of_week,
    }))
}

/// Arguments of the `add` command, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub user: u64,
    pub assign: Option<u64>,
    pub recur: Option<String>,
    pub every: u32,
    pub days: Vec<u8>,
}

/// Adds a new task, with its recurrence pattern if one was given.
pub fn cmd_add(store: &JsonStore, args: AddArgs) -> Result<Task, CommandError> {
    let start_date = parse_date(&args.start)?;
    let end_date = args.end.as_deref().map(parse_date).transpose()?;
    let pattern = parse_recurrence(args.recur.as_deref(), args.every, &args.days)?;

    let task = store.add_task(
        NewTask {
            title: args.title,
            start_date,
            end_date,
            created_by_user_id: args.user,
            assigned_user_id: args.assign,
        },
        pattern,
    )?;
    println!("Task added (id = {})", task.id);
    Ok(task)
}

/// Marks the occurrence of task `id` on `date` as complete.
pub fn cmd_complete(store: &JsonStore, id: u64, date: &str) -> Result<CompletedInstance, CommandError> {
    let instance_date = parse_date(date)?;
    if store.task(id)?.is_none() {
        return Err(CommandError::TaskNotFound(id));
    }
    let done = store.record_completion(id, instance_date, Utc::now())?;
    println!("Task {} marked as complete for {}.", id, instance_date);
    Ok(done)
}

/// Prints whether task `id` is due on `date`.
pub fn cmd_check(
    store: &JsonStore,
    clock: &dyn Clock,
    id: u64,
    date: &str,
) -> Result<bool, CommandError> {
    let date = parse_date(date)?;
    let task = store.task(id)?.ok_or(CommandError::TaskNotFound(id))?;
    let pattern = store.pattern(id)?;
    let completed = store.completion(id, date)?;

    let due = is_due(&task, pattern.as_ref(), completed.as_ref(), date, clock.now());
    if due {
        println!("Task {} is due on {}.", id, date);
    } else {
        println!("Task {} is not due on {}.", id, date);
    }
    Ok(due)
}

/// Lists the tasks due for `user` on `date` (today when omitted).
pub fn cmd_due(
    store: &JsonStore,
    clock: &dyn Clock,
    user: u64,
    date: Option<&str>,
) -> Result<Vec<DueTask>, CommandError> {
    let date = match date {
        Some(d) => parse_date(d)?,
        None => clock.now().date(),
    };
    let due = due_tasks(store, clock, date, user)?;
    if due.is_empty() {
        println!("No tasks due on {}.", date);
        return Ok(due);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("Recurrence").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for row in &due {
        let (status, color) = match &row.completed {
            Some(c) => (format!("Done {}", c.completed_at.format("%Y-%m-%d %H:%M")), Color::Green),
            None => ("Pending".to_string(), Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(row.task.id),
            Cell::new(&row.task.title),
            Cell::new(row.task.start_date),
            Cell::new(describe_recurrence(row.recurrence.as_ref())),
            Cell::new(status).fg(color),
        ]);
    }

    println!("Due on {}:", date);
    println!("{table}");
    Ok(due)
}

/// Lists every stored task.
pub fn cmd_list(store: &JsonStore) -> Result<(), CommandError> {
    let tables = store.load()?;
    if tables.tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Start", "End", "Owner", "Assignee", "Recurrence", "Done"]);

    for t in &tables.tasks {
        let pattern = tables.patterns.iter().find(|p| p.task_id == t.id);
        let done = tables.completions.iter().filter(|c| c.task_id == t.id).count();
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.start_date),
            Cell::new(t.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(t.created_by_user_id),
            Cell::new(t.assigned_user_id.map(|u| u.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(describe_recurrence(pattern)),
            Cell::new(done),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Deletes all data files, asking first unless `force` is set.
pub fn cmd_reset(store: &JsonStore, force: bool) -> Result<(), CommandError> {
    if !force {
        print!("Are you sure you want to delete all tasks and completions? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset()?;
    println!("Database reset successfully.");
    Ok(())
}

/// Short human readable form of a pattern.
pub fn describe_recurrence(pattern: Option<&RecurrencePattern>) -> String {
    let Some(pattern) = pattern else {
        return "one-time".to_string();
    };
    match pattern.rule() {
        Some(Recurrence::Daily { separation_count: 0 }) => "daily".to_string(),
        Some(Recurrence::Daily { separation_count }) => format!("daily, skip {}", separation_count),
        Some(Recurrence::Weekly { separation_count, days }) => {
            let names: Vec<&str> = days.codes().into_iter().map(weekday_name).collect();
            let mut s = String::from("weekly");
            if separation_count > 0 {
                s.push_str(&format!(", skip {}", separation_count));
            }
            if names.is_empty() {
                s.push_str(" (no days)");
            } else {
                s.push_str(&format!(" on {}", names.join(" ")));
            }
            s
        }
        None => "unknown".to_string(),
    }
}

fn weekday_name(code: u8) -> &'static str {
    match code {
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        _ => "Sun",
    }
}
