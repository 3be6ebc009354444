//! termrun CLI - Run templated scripts against network hosts
//!
//! This module contains the CLI implementation used by the binary.

mod commands;
mod output;
mod prompt;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use termrun_core::{config, get_version_long, load_config_from};
use tracing_subscriber::EnvFilter;

/// Run templated Telnet/SSH scripts against many hosts
#[derive(Parser)]
#[command(name = "termrun")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run templated Telnet/SSH scripts against many hosts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script on every given host
    Run(commands::RunArgs),
    /// Show configuration
    Config(commands::ConfigArgs),
}

/// Log filter for a `-v` count; `RUST_LOG` wins when set
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => config::get_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?,
    };

    let config = match load_config_from(&config_path) {
        Ok(config) => {
            if cli.verbose > 0 {
                eprintln!("{} termrun {}", style("[info]").cyan(), get_version_long());
                eprintln!(
                    "{} Config: {}",
                    style("[info]").cyan(),
                    config_path.display()
                );
            }
            config
        }
        Err(e) => {
            eprintln!("{} Configuration error", style("Error:").red().bold());
            eprintln!();
            eprintln!("  {:#}", e);
            eprintln!();
            eprintln!("  Config file: {}", style(config_path.display()).yellow());
            eprintln!();
            eprintln!(
                "  {} Check the config file for syntax errors or unknown fields.",
                style("Tip:").cyan()
            );
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Run(args) => commands::cmd_run(&args, &config, cli.quiet),
        Commands::Config(args) => commands::cmd_config(args, &config, &config_path),
    }
}
