//! Entity types command handler

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::api::TypeSource;
use crate::cli::CliContext;

#[derive(Args, Debug, Clone)]
pub struct TypesCommands {
    /// Print one name per line without the header
    #[arg(long)]
    pub plain: bool,
}

pub async fn handle_types_command(args: TypesCommands, context: &CliContext) -> Result<()> {
    let client = context.client()?;
    let (types, source) = client.entity_types().await;

    if args.plain {
        for name in &types {
            println!("{}", name);
        }
        return Ok(());
    }

    println!("{}", source_header(types.len(), source).bold());
    for name in &types {
        println!("  {}", name.bright_green());
    }

    if source == TypeSource::Fallback {
        eprintln!(
            "{}",
            "Entity type discovery failed; showing the built-in list. Other types may exist."
                .yellow()
        );
    }

    Ok(())
}

fn source_header(count: usize, source: TypeSource) -> String {
    match source {
        TypeSource::Discovered => format!("{} entity type(s) discovered", count),
        TypeSource::Fallback => format!("{} built-in entity type(s)", count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_header() {
        assert_eq!(source_header(3, TypeSource::Discovered), "3 entity type(s) discovered");
        assert_eq!(source_header(30, TypeSource::Fallback), "30 built-in entity type(s)");
    }
}
