use std::io::IsTerminal;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tarea_shared::{Priority, SortMode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tarea", version, about = "Task list client for the tarea service")]
pub struct Cli {
    /// Base URL of the task service API; falls back to $TAREA_URL,
    /// then http://localhost:3000/api.
    #[arg(long = "url")]
    pub url: Option<String>,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks in the current view.
    List {
        /// Category id, or "all".
        #[arg(long)]
        category: Option<String>,
        /// Show completed instead of pending tasks.
        #[arg(long)]
        completed: bool,
        /// Case-insensitive substring match over title and notes.
        #[arg(long)]
        search: Option<String>,
        /// Sort mode; defaults to the manual position order.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
    /// Add a task; it appends to the end of the manual order.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        /// Due date, YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Start date, YYYY-MM-DD.
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Modify fields of a task.
    Modify {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, conflicts_with = "no_category")]
        category: Option<String>,
        /// Clear the category.
        #[arg(long)]
        no_category: bool,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Clear the due date.
        #[arg(long)]
        no_due: bool,
        #[arg(long, conflicts_with = "no_start")]
        start: Option<NaiveDate>,
        /// Clear the start date.
        #[arg(long)]
        no_start: bool,
    },
    /// Toggle completion of a task.
    Done { id: String },
    /// Delete a task.
    Delete { id: String },
    /// Move a task to a new slot in the visible pending list.
    Move {
        id: String,
        /// Target slot, 0-based, within the visible list.
        index: usize,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Category maintenance.
    Categories {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Counters over the whole task set.
    Stats,
    /// Service liveness.
    Health,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        id: Option<String>,
        /// 6-digit hex, e.g. #6366f1.
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },
    Modify {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },
    Delete { id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SortArg {
    Position,
    Due,
    Priority,
    Created,
}

impl From<SortArg> for SortMode {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Position => SortMode::Position,
            SortArg::Due => SortMode::DueDate,
            SortArg::Priority => SortMode::Priority,
            SortArg::Created => SortMode::Created,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
