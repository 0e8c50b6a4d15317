//! CLI command definitions and handlers

pub mod search;
pub mod types;

pub use search::{SearchCommands, handle_search_command};
pub use types::{TypesCommands, handle_types_command};
