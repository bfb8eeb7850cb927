//! # dueday
//!
//! Answers "which tasks are due for user U on day D" from recurring task rules and
//! the occurrences already marked complete.
//!
//! ## Usage
//!
//! ```bash
//! # One-time task
//! dueday add "File taxes" --start 2025-04-15 --user 1
//!
//! # Every other day, assigned to user 2
//! dueday add "Water plants" --start 2025-01-01 --user 1 --assign 2 --recur daily --every 1
//!
//! # Mondays and Wednesdays
//! dueday add "Standup" --start 2025-01-06 --user 1 --recur weekly --days 1,3
//!
//! # Mark one occurrence done
//! dueday complete 2 --date 2025-01-03
//!
//! # What is due today, or on a given day
//! dueday due --user 1
//! dueday due --user 1 --date 2025-01-08
//!
//! # Check a single task
//! dueday check 3 --date 2025-01-08
//! ```
//!
//! ## Data Storage
//!
//! Data lives in `tasks.json`, `patterns.json` and `completions.json` inside the data
//! directory (`~/.local/share/dueday` on Linux). Override it with `--data-dir`,
//! `DUEDAY_DATA_DIR`, or `[storage] data_dir` in `~/.config/dueday/config.toml`.
//! Logs go to stderr; set the filter with `RUST_LOG`, `--log-level` or `DUEDAY_LOG`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use dueday::clock::{Clock, FixedClock, SystemClock};
use dueday::commands::*;
use dueday::config::{Config, Overrides};
use dueday::storage::JsonStore;
use tracing::debug;

#[derive(Parser)]
#[command(name = "dueday")]
#[command(about = "Which tasks are due today", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/dueday/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the data files
    #[arg(long, global = true, env = "DUEDAY_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DUEDAY_LOG")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Start date in YYYY-MM-DD
        #[arg(short, long)]
        start: String,
        /// End date in YYYY-MM-DD
        #[arg(short, long)]
        end: Option<String>,
        /// Creating user
        #[arg(short, long)]
        user: u64,
        /// Assigned user
        #[arg(short, long)]
        assign: Option<u64>,
        /// Recurrence (daily, weekly)
        #[arg(short, long)]
        recur: Option<String>,
        /// Intervals skipped between occurrences (0 = every interval)
        #[arg(long, default_value_t = 0)]
        every: u32,
        /// Weekdays for weekly tasks, 1 (Mon) to 7 (Sun), comma separated
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
    },
    /// Mark one occurrence of a task as complete
    Complete {
        id: u64,
        /// Occurrence date in YYYY-MM-DD
        #[arg(short, long)]
        date: String,
    },
    /// List tasks due for a user on a day
    Due {
        #[arg(short, long)]
        user: u64,
        /// Day in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Evaluate as if the current time were YYYY-MM-DDTHH:MM:SS
        #[arg(long)]
        now: Option<String>,
    },
    /// Check whether a single task is due on a day
    Check {
        id: u64,
        /// Day in YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        /// Evaluate as if the current time were YYYY-MM-DDTHH:MM:SS
        #[arg(long)]
        now: Option<String>,
    },
    /// List all tasks
    List,
    /// Reset the database (delete all tasks and completions)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn clock_for(now: Option<&str>) -> Result<Box<dyn Clock>, CommandError> {
    match now {
        Some(s) => Ok(Box::new(FixedClock(parse_timestamp(s)?))),
        None => Ok(Box::new(SystemClock)),
    }
}

fn run(command: Commands, store: &JsonStore) -> Result<(), CommandError> {
    match command {
        Commands::Add { title, start, end, user, assign, recur, every, days } => {
            cmd_add(store, AddArgs { title, start, end, user, assign, recur, every, days })?;
        }
        Commands::Complete { id, date } => {
            cmd_complete(store, id, &date)?;
        }
        Commands::Due { user, date, now } => {
            let clock = clock_for(now.as_deref())?;
            cmd_due(store, clock.as_ref(), user, date.as_deref())?;
        }
        Commands::Check { id, date, now } => {
            let clock = clock_for(now.as_deref())?;
            cmd_check(store, clock.as_ref(), id, &date)?;
        }
        Commands::List => cmd_list(store)?,
        Commands::Reset { force } => cmd_reset(store, force)?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "dueday", &mut io::stdout());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let overrides = Overrides {
        config: cli.config,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
    };
    let config = match Config::load(&overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);
    debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let store = JsonStore::new(&config.data_dir);
    match run(cli.command, &store) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
