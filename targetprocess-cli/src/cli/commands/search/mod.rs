//! `search` command: query entities of one type

mod handler;

pub use handler::handle_search_command;

use clap::{Args, ValueEnum};

#[derive(Args, Debug, Clone)]
pub struct SearchCommands {
    /// Entity type to search, e.g. UserStory, Bug, Task
    pub entity_type: String,

    /// Filter in the Targetprocess query language,
    /// e.g. "EntityState.Name eq 'Open' and Project.Name eq 'Core'"
    #[arg(short, long = "where")]
    pub where_clause: Option<String>,

    /// Related data to include (repeatable), e.g. Project, Team, AssignedUser
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub take: Option<u32>,

    /// Sort fields in priority order (repeatable); asc/desc keywords are ignored
    #[arg(short, long = "order-by")]
    pub order_by: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Print the whole result instead of paging it
    #[arg(long)]
    pub all: bool,

    /// Print the compiled query string without contacting the service
    #[arg(long)]
    pub dry: bool,

    /// Show timing and query details
    #[arg(long, value_enum, default_value_t = DisplayStyle::Minimal)]
    pub style: DisplayStyle,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
    /// CSV with one row per entity
    Csv,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStyle {
    Minimal,
    Verbose,
}
