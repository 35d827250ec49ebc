use clap::{Args, Parser, Subcommand, ValueEnum};

/// Offline-first daily task list with background sync
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task
    Add(AddCommand),
    /// List tasks for a day
    List(ListCommand),
    /// Mark a task as completed
    Done(IdCommand),
    /// Mark a completed task as pending again
    Undo(IdCommand),
    /// Edit a task
    Edit(EditCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Upload every local task to the remote store
    Push,
    /// Merge the remote snapshot into the local store
    Pull,
    /// Create any missing instances of recurring tasks
    Recur(RecurCommand),
    /// Show sync status and the pending queue
    Status,
    /// Delete all local data and the sync queue
    Clear(ClearCommand),
    /// Keep today's list on screen and sync in the background
    Watch,
}

/// Recurrence frequency accepted by `--every`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RecurrenceArgs {
    /// How often the task repeats
    #[arg(long, value_enum)]
    pub every: Option<Frequency>,
    /// Days of week for weekly recurrence
    #[arg(long, help = "Days of week (mon,tue,wed,thu,fri,sat,sun)")]
    pub on: Option<String>,
    /// Interval in days for custom recurrence
    #[arg(long)]
    pub interval: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The description of the task
    #[arg(short, long)]
    pub description: Option<String>,
    /// The day of the task (e.g. "tomorrow", "2024-06-03"); defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// Expected effort in hours
    #[arg(long)]
    pub hours: Option<f64>,
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Day to list; defaults to today
    #[arg(long, conflicts_with = "all")]
    pub date: Option<String>,
    /// List every task regardless of day
    #[arg(long)]
    pub all: bool,
    /// Only completed tasks
    #[arg(long, conflicts_with = "pending")]
    pub done: bool,
    /// Only pending tasks
    #[arg(long)]
    pub pending: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct IdCommand {
    /// The local ID of the task
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The local ID of the task to edit
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub hours: Option<f64>,

    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    #[arg(long, conflicts_with_all = ["every", "on", "interval"], help = "Remove recurrence (convert to one-time task)")]
    pub recurrence_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The local ID of the task to delete
    pub id: i64,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurCommand {
    /// Materialize through this day instead of today
    #[arg(long)]
    pub through: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ClearCommand {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}
