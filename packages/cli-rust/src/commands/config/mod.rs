//! Config subcommand implementations
//!
//! Provides `termrun config` subcommands for viewing configuration.

mod show;

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use termrun_core::Config;

pub use show::cmd_config_show;

/// Configuration command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Output as JSON instead of table format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show current configuration
    Show {
        /// Output as JSON instead of table format
        #[arg(long)]
        json: bool,
    },
    /// Print the path of the config file
    Path,
}

/// Handle config command
///
/// Defaults to Show when no subcommand is given.
pub fn cmd_config(args: ConfigArgs, config: &Config, config_path: &Path) -> Result<()> {
    match args.command {
        Some(ConfigSubcommands::Show { json }) => cmd_config_show(config, json),
        Some(ConfigSubcommands::Path) => {
            println!("{}", config_path.display());
            Ok(())
        }
        None => cmd_config_show(config, args.json),
    }
}
