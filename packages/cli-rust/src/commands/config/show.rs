//! Config show subcommand
//!
//! Displays current configuration in table or JSON format.

use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use termrun_core::Config;

/// Show current configuration
pub fn cmd_config_show(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{}", config_table(config));
    }
    Ok(())
}

fn config_table(config: &Config) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);

    table.add_row(vec![
        Cell::new("version"),
        Cell::new(config.version.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("domain"),
        Cell::new(format_optional(Some(&config.domain).filter(|d| !d.is_empty()))),
    ]);
    table.add_row(vec![
        Cell::new("logdir"),
        Cell::new(format_optional(
            config.logdir.as_ref().map(|p| p.display().to_string()).as_ref(),
        )),
    ]);
    table.add_row(vec![
        Cell::new("overwrite_logs"),
        Cell::new(config.overwrite_logs.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("max_threads"),
        Cell::new(config.max_threads.to_string()).fg(if config.max_threads > 1 {
            Color::Cyan
        } else {
            Color::Reset
        }),
    ]);
    table.add_row(vec![Cell::new("protocol"), Cell::new(&config.protocol)]);

    if config.defines.is_empty() {
        table.add_row(vec![Cell::new("defines"), Cell::new("(none)")]);
    }
    for (key, value) in &config.defines {
        table.add_row(vec![Cell::new(format!("defines.{key}")), Cell::new(value)]);
    }
    table
}

fn format_optional(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| "(not set)".to_string())
}
