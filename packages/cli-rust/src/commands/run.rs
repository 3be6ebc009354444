//! Run command implementation
//!
//! Registers hosts, loads the script and dispatches one session per host.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use termrun_core::session::ConnectSpec;
use termrun_core::{
    Config, DryRunTransport, ProcessTransport, RunOptions, Runner, SessionRunner, Transport,
    WorkQueue, validate_protocol,
};

use crate::output::{Outcome, RunProgress, outcome_style, summary_rows, summary_table};
use crate::prompt::TerminalResolver;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Script file to run on every host
    pub script: PathBuf,

    /// Hosts, e.g. `ssh://admin@r1:22?vlan=10`
    pub hosts: Vec<String>,

    /// Read hosts from a file, one per line
    #[arg(long = "hosts-file", value_name = "FILE")]
    pub hosts_files: Vec<PathBuf>,

    /// Read hosts and per-host variables from a tab-separated file
    #[arg(long = "csv", value_name = "FILE")]
    pub tables: Vec<PathBuf>,

    /// Define a variable for every host
    #[arg(short = 'd', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Number of hosts to run in parallel
    #[arg(short = 'c', long = "connections", value_name = "N")]
    pub connections: Option<usize>,

    /// Domain appended to hostnames without a dot
    #[arg(long)]
    pub domain: Option<String>,

    /// Write per-host logs to this directory
    #[arg(long, value_name = "DIR")]
    pub logdir: Option<PathBuf>,

    /// Truncate existing logs instead of appending
    #[arg(long)]
    pub overwrite_logs: bool,

    /// Print what would be sent instead of connecting
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub options: RunOptions,
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Command line flags take precedence over the config file
fn effective_config(args: &RunArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(domain) = &args.domain {
        config.domain = domain.clone();
    }
    if let Some(logdir) = &args.logdir {
        config.logdir = Some(logdir.clone());
    }
    if args.overwrite_logs {
        config.overwrite_logs = true;
    }
    if let Some(connections) = args.connections {
        config.max_threads = connections.max(1);
    }
    config
}

fn effective_options(args: &RunArgs, config: &Config) -> RunOptions {
    let mut options = args.options.clone();
    if options.protocol.is_none() {
        options.protocol = Some(config.protocol.clone());
    }
    options
}

/// Run the script against every host
pub fn cmd_run(args: &RunArgs, config: &Config, quiet: bool) -> Result<()> {
    let config = effective_config(args, config);
    let options = effective_options(args, &config);
    if let Some(protocol) = &options.protocol {
        validate_protocol(protocol).map_err(|e| anyhow::anyhow!(e))?;
    }

    let mut runner = Runner::new(&config);
    runner.define(args.defines.iter().cloned());

    let mut resolver = TerminalResolver::new();
    runner
        .add_hosts(&args.hosts, &mut resolver)
        .context("Failed to add hosts")?;
    for path in &args.hosts_files {
        runner
            .add_hosts_from_file(path, &mut resolver)
            .with_context(|| format!("Failed to read hosts from {}", path.display()))?;
    }
    for path in &args.tables {
        runner
            .add_hosts_from_tabular(path, &mut resolver)
            .with_context(|| format!("Failed to read hosts from {}", path.display()))?;
    }
    if runner.registry().is_empty() {
        bail!("No hosts given. Pass hosts as arguments, --hosts-file or --csv.");
    }

    runner
        .load_from_file(&args.script)
        .with_context(|| format!("Failed to load script {}", args.script.display()))?;

    let total = runner.registry().len();
    tracing::debug!("Registered {} hosts", total);
    let echo = config.max_threads == 1 && !options.no_echo;
    if !quiet {
        eprintln!(
            "{} Running {} on {} host{} ({} at a time)",
            style("[info]").cyan(),
            style(args.script.display()).bold(),
            total,
            if total == 1 { "" } else { "s" },
            config.max_threads
        );
    }

    let factory: fn(&ConnectSpec) -> Box<dyn Transport> = if args.dry_run {
        |_: &ConnectSpec| -> Box<dyn Transport> { Box::new(DryRunTransport::new()) }
    } else {
        |_: &ConnectSpec| -> Box<dyn Transport> { Box::new(ProcessTransport::new()) }
    };

    let progress = RunProgress::new_maybe(total, quiet || echo);
    let hook = progress.clone();
    let mut queue = WorkQueue::new(config.max_threads, SessionRunner::new(factory))
        .on_complete(move |report| hook.record(report));

    let started = Instant::now();
    let rt = tokio::runtime::Runtime::new()?;
    let (summary, reports) = rt.block_on(async {
        let summary = runner.run(&mut queue, &options).await;
        // Sequences already submitted finish even when dispatch stopped early
        let reports = queue.join().await;
        (summary, reports)
    });
    progress.finish();
    let summary = summary.context("Dispatch stopped")?;

    let failed =
        reports.iter().filter(|r| !r.is_success()).count() + summary.failed.len();
    let succeeded = reports.len() + summary.failed.len() - failed;
    if !quiet {
        for (host, error) in &summary.failed {
            eprintln!("{} {}: {}", outcome_style(Outcome::Failed), host, error);
        }
        for host in &summary.skipped {
            eprintln!(
                "{} {}: unsupported protocol",
                outcome_style(Outcome::Skipped),
                host
            );
        }
        println!("{}", summary_table(&summary_rows(&reports, &summary)));
        let elapsed = Duration::from_secs(started.elapsed().as_secs());
        println!(
            "{} of {} hosts succeeded in {}",
            succeeded,
            total,
            humantime::format_duration(elapsed)
        );
    }

    if failed > 0 {
        bail!("{failed} of {total} hosts failed");
    }
    Ok(())
}
