use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::models::{CompletedInstance, DueTask, NewTask, RecurrencePattern, Task};

/// Errors raised by a task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A data file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A data file exists but does not hold valid JSON for its table.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The occurrence was already recorded as completed.
    #[error("task {task_id} is already completed for {instance_date}")]
    DuplicateCompletion {
        task_id: u64,
        instance_date: NaiveDate,
    },
    #[error("task {0} not found")]
    TaskNotFound(u64),
}

/// Read side consumed by the due-task query.
pub trait TaskStore {
    /// Tasks created by or assigned to `user_id`, each joined with its recurrence
    /// pattern and with the completion recorded for `date`. Ordered by task id.
    fn due_candidates(&self, user_id: u64, date: NaiveDate) -> Result<Vec<DueTask>, StoreError>;
}

/// Snapshot of the three tables: tasks, recurrence patterns and completed instances.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tables {
    pub tasks: Vec<Task>,
    pub patterns: Vec<RecurrencePattern>,
    pub completions: Vec<CompletedInstance>,
}

impl Tables {
    fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn task_exists(&self, id: u64) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Inserts a task with the next free id, along with its pattern if any.
    pub fn add_task(&mut self, new: NewTask, pattern: Option<RecurrencePattern>) -> Task {
        let task = Task {
            id: self.next_task_id(),
            title: new.title,
            start_date: new.start_date,
            end_date: new.end_date,
            created_by_user_id: new.created_by_user_id,
            assigned_user_id: new.assigned_user_id,
            created_at: Utc::now(),
        };
        if let Some(mut p) = pattern {
            p.task_id = task.id;
            self.patterns.push(p);
        }
        self.tasks.push(task.clone());
        task
    }

    /// Attaches `pattern` to its task, replacing any existing one.
    pub fn set_pattern(&mut self, pattern: RecurrencePattern) -> Result<(), StoreError> {
        if !self.task_exists(pattern.task_id) {
            return Err(StoreError::TaskNotFound(pattern.task_id));
        }
        self.patterns.retain(|p| p.task_id != pattern.task_id);
        self.patterns.push(pattern);
        Ok(())
    }

    /// Removes the pattern of `task_id`, turning it into a one-time task.
    pub fn clear_pattern(&mut self, task_id: u64) -> Result<(), StoreError> {
        if !self.task_exists(task_id) {
            return Err(StoreError::TaskNotFound(task_id));
        }
        self.patterns.retain(|p| p.task_id != task_id);
        Ok(())
    }

    /// Appends a completion. At most one may exist per task and instance date.
    pub fn insert_completion(&mut self, completion: CompletedInstance) -> Result<(), StoreError> {
        if !self.task_exists(completion.task_id) {
            return Err(StoreError::TaskNotFound(completion.task_id));
        }
        let duplicate = self.completions.iter().any(|c| {
            c.task_id == completion.task_id && c.instance_date == completion.instance_date
        });
        if duplicate {
            return Err(StoreError::DuplicateCompletion {
                task_id: completion.task_id,
                instance_date: completion.instance_date,
            });
        }
        self.completions.push(completion);
        Ok(())
    }

    /// The left join behind [`TaskStore::due_candidates`].
    pub fn candidates(&self, user_id: u64, date: NaiveDate) -> Vec<DueTask> {
        let mut rows: Vec<DueTask> = self
            .tasks
            .iter()
            .filter(|t| t.is_visible_to(user_id))
            .map(|t| DueTask {
                task: t.clone(),
                recurrence: self.patterns.iter().find(|p| p.task_id == t.id).cloned(),
                completed: self
                    .completions
                    .iter()
                    .find(|c| c.task_id == t.id && c.instance_date == date)
                    .cloned(),
            })
            .collect();
        rows.sort_by_key(|r| r.task.id);
        rows
    }
}

/// Store kept entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub tables: Tables,
}

impl MemoryStore {
    pub fn new(tables: Tables) -> Self {
        Self { tables }
    }
}

impl TaskStore for MemoryStore {
    fn due_candidates(&self, user_id: u64, date: NaiveDate) -> Result<Vec<DueTask>, StoreError> {
        Ok(self.tables.candidates(user_id, date))
    }
}

/// Store backed by JSON files in a data directory:
/// `tasks.json`, `patterns.json` and `completions.json`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tasks_path(&self) -> PathBuf {
        self.dir.join("tasks.json")
    }

    fn patterns_path(&self) -> PathBuf {
        self.dir.join("patterns.json")
    }

    fn completions_path(&self) -> PathBuf {
        self.dir.join("completions.json")
    }

    /// Loads all three tables. Missing files read as empty tables.
    pub fn load(&self) -> Result<Tables, StoreError> {
        Ok(Tables {
            tasks: load_table(&self.tasks_path())?,
            patterns: load_table(&self.patterns_path())?,
            completions: load_table(&self.completions_path())?,
        })
    }

    /// Overwrites all three files with `tables`.
    pub fn save(&self, tables: &Tables) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        save_table(&self.tasks_path(), &tables.tasks)?;
        save_table(&self.patterns_path(), &tables.patterns)?;
        save_table(&self.completions_path(), &tables.completions)
    }

    /// Loads all tasks.
    pub fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        load_table(&self.tasks_path())
    }

    /// Loads a single task by its ID.
    pub fn task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks()?.into_iter().find(|t| t.id == id))
    }

    /// Loads the recurrence pattern of a task, if it has one.
    pub fn pattern(&self, task_id: u64) -> Result<Option<RecurrencePattern>, StoreError> {
        let patterns: Vec<RecurrencePattern> = load_table(&self.patterns_path())?;
        Ok(patterns.into_iter().find(|p| p.task_id == task_id))
    }

    /// Loads the completion for `task_id` on `date`, if recorded.
    pub fn completion(
        &self,
        task_id: u64,
        date: NaiveDate,
    ) -> Result<Option<CompletedInstance>, StoreError> {
        let completions: Vec<CompletedInstance> = load_table(&self.completions_path())?;
        Ok(completions
            .into_iter()
            .find(|c| c.task_id == task_id && c.instance_date == date))
    }

    /// Creates a task (and its pattern) and persists it.
    pub fn add_task(
        &self,
        new: NewTask,
        pattern: Option<RecurrencePattern>,
    ) -> Result<Task, StoreError> {
        let mut tables = self.load()?;
        let task = tables.add_task(new, pattern);
        self.save(&tables)?;
        info!(task_id = task.id, "task added");
        Ok(task)
    }

    /// Records `task_id` as completed for `instance_date`.
    ///
    /// Fails with [`StoreError::DuplicateCompletion`] if that occurrence is already complete.
    pub fn record_completion(
        &self,
        task_id: u64,
        instance_date: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletedInstance, StoreError> {
        let mut tables = self.load()?;
        let completion = CompletedInstance {
            task_id,
            completed_at,
            instance_date,
        };
        if let Err(e) = tables.insert_completion(completion.clone()) {
            warn!(task_id, %instance_date, error = %e, "completion rejected");
            return Err(e);
        }
        save_table(&self.completions_path(), &tables.completions)?;
        info!(task_id, %instance_date, "occurrence completed");
        Ok(completion)
    }

    /// Deletes all data files.
    pub fn reset(&self) -> Result<(), StoreError> {
        for path in [self.tasks_path(), self.patterns_path(), self.completions_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        Ok(())
    }
}

impl TaskStore for JsonStore {
    fn due_candidates(&self, user_id: u64, date: NaiveDate) -> Result<Vec<DueTask>, StoreError> {
        Ok(self.load()?.candidates(user_id, date))
    }
}

fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let mut f = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut s = String::new();
    f.read_to_string(&mut s).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let s = serde_json::to_string_pretty(rows).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    f.write_all(s.as_bytes()).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
