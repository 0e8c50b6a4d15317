//! Command line interface

pub mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

use crate::api::TargetprocessClient;
use crate::config::Config;
use crate::services::ResultPaginator;
use commands::{SearchCommands, TypesCommands};

#[derive(Parser, Debug)]
#[command(name = "targetprocess-cli", version, about = "Query Targetprocess entities from the terminal")]
pub struct Cli {
    /// Config file (defaults to ~/.config/targetprocess-cli/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search entities of one type
    Search(SearchCommands),
    /// List the entity types the service accepts
    Types(TypesCommands),
}

impl Cli {
    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Shared state for one CLI invocation
pub struct CliContext {
    pub config: Config,
    pub paginator: ResultPaginator,
}

impl CliContext {
    pub fn new(config: Config) -> Self {
        let paginator = ResultPaginator::new(config.pagination());
        Self { config, paginator }
    }

    pub fn client(&self) -> Result<TargetprocessClient> {
        let base_url = self.config.base_url()?;
        let auth = self.config.auth()?;
        debug!("Using {} authentication against {}", auth.mode_name(), base_url);
        TargetprocessClient::new(base_url, auth, self.config.resilience())
            .context("Failed to create Targetprocess client")
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    let context = CliContext::new(config);

    match cli.command {
        Commands::Search(args) => commands::handle_search_command(args, &context).await,
        Commands::Types(args) => commands::handle_types_command(args, &context).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "targetprocess-cli",
            "-vv",
            "search",
            "UserStory",
            "--where",
            "EntityState.Name eq 'Open'",
            "-o",
            "Priority",
            "-o",
            "Name",
            "--take",
            "10",
            "--dry",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.entity_type, "UserStory");
                assert_eq!(args.where_clause.as_deref(), Some("EntityState.Name eq 'Open'"));
                assert_eq!(args.order_by, vec!["Priority", "Name"]);
                assert_eq!(args.take, Some(10));
                assert!(args.dry);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_client_requires_credentials() {
        let context = CliContext::new(Config::default());
        let err = context.client().err().unwrap();
        assert!(err.to_string().contains("No Targetprocess URL configured"));
    }
}
