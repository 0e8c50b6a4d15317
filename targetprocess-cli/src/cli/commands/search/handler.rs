//! Search command handler

use anyhow::{Context, Result};
use colored::*;
use dialoguer::Confirm;
use is_terminal::IsTerminal;
use serde_json::Value;
use std::time::Instant;

use super::{DisplayStyle, OutputFormat, SearchCommands};
use crate::api::pluralization::collection_name;
use crate::api::{AuthConfig, SearchRequest};
use crate::cli::CliContext;

/// Handle the search command
pub async fn handle_search_command(args: SearchCommands, context: &CliContext) -> Result<()> {
    let verbose = matches!(args.style, DisplayStyle::Verbose);

    let request = SearchRequest {
        entity_type: args.entity_type.clone(),
        where_clause: args.where_clause.clone(),
        include: args.include.clone(),
        take: args.take,
        order_by: args.order_by.clone(),
    };

    // Dry run: compile only, no entity type check and no request
    if args.dry {
        let query = request.compile().context("Failed to compile query")?;
        let auth = match context.config.auth() {
            Ok(AuthConfig::ApiKey { .. }) => AuthConfig::api_key("***"),
            _ => AuthConfig::basic(""),
        };
        println!(
            "/api/v1/{}?{}",
            collection_name(request.entity_type.trim()),
            query.to_query_string(&auth)
        );
        return Ok(());
    }

    let client = context.client()?;

    if verbose {
        println!(
            "Searching {} on {}",
            request.entity_type.bright_green().bold(),
            client.transport().base_url().cyan()
        );
    }

    let start = Instant::now();
    let items = client
        .search_entities(&request)
        .await
        .context("Failed to execute search")?;

    if verbose {
        println!(
            "{} result(s) in {:.2}ms",
            items.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        println!();
    }

    let formatted = format_output(&Value::Array(items), args.output)?;
    let first = context.paginator.store(formatted);

    if args.all || !first.has_more {
        println!("{}", context.paginator.all(&first.key)?);
        return Ok(());
    }

    println!("{}", first.text);

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        eprintln!(
            "{}",
            format!(
                "Output truncated (page 1 of {}). Re-run with --all to print everything.",
                first.total_pages
            )
            .yellow()
        );
        return Ok(());
    }

    let mut current = first;
    while current.has_more {
        let show_more = Confirm::new()
            .with_prompt(format!(
                "Show more? (page {} of {})",
                current.number + 1,
                current.total_pages
            ))
            .default(true)
            .interact()
            .context("Failed to read answer")?;
        if !show_more {
            break;
        }
        current = context.paginator.page(&current.key, None)?;
        println!("{}", current.text);
    }

    Ok(())
}

/// Format search results according to the specified output format
pub fn format_output(data: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).context("Failed to format JSON output")
        }
        OutputFormat::JsonCompact => {
            serde_json::to_string(data).context("Failed to format JSON output")
        }
        OutputFormat::Csv => json_to_csv(data),
    }
}

/// One row per entity, columns are the union of top-level keys in order of
/// first appearance
fn json_to_csv(data: &Value) -> Result<String> {
    let rows: Vec<&serde_json::Map<String, Value>> = match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    };

    if rows.is_empty() {
        return Ok("No data\n".to_string());
    }

    let mut headers: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers).context("Failed to write CSV header")?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| json_value_to_string(row.get(*h).unwrap_or(&Value::Null)))
            .collect();
        writer.write_record(&record).context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Convert a JSON value to a string representation
fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
