//! Template runner
//!
//! The runner owns everything a run needs: the loaded script, the host
//! registry with its variables, and the settings that shape each session.
//! [`Runner::compile`] turns one registered host into a [`Sequence`];
//! [`Runner::run`] feeds the sequences of all hosts to a [`WorkQueue`].

mod compile;
mod error;
mod options;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::RunnerError;
pub use options::RunOptions;

use crate::config::Config;
use crate::host::{
    CredentialResolver, DEFAULT_PROTOCOL, HostEntry, HostError, HostRegistry, HostUrl,
};
use crate::queue::WorkQueue;
use crate::session::SequenceRunner;
use crate::template::{LineTemplateParser, TemplateParser};
use crate::vars::{FILENAME_VAR, PARENT_VAR, RUNNER_VAR, Variables};

/// What a compiled script can see of the run executing it
pub trait RunContext {
    /// Sequences that may run in parallel
    fn max_threads(&self) -> usize;

    /// Name exposed to scripts as `__runner__`
    fn name(&self) -> &str;

    /// Name of the enclosing script, exposed as `__exscript__`
    fn enclosing_script(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone)]
struct LoadedScript {
    code: String,
    filename: Option<PathBuf>,
}

/// Result of dispatching every registered host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Sequences handed to the queue
    pub submitted: usize,
    /// Host strings skipped because of an unsupported protocol
    pub skipped: Vec<String>,
    /// Host strings whose script failed to compile, with the error
    pub failed: Vec<(String, String)>,
}

/// Loaded script, registered hosts and run settings
pub struct Runner {
    parser: Box<dyn TemplateParser>,
    registry: HostRegistry,
    script: Option<LoadedScript>,
    domain: String,
    logdir: Option<PathBuf>,
    overwrite_logs: bool,
}

impl Runner {
    /// Create a runner using the line template parser
    pub fn new(config: &Config) -> Self {
        Self::with_parser(config, LineTemplateParser)
    }

    /// Create a runner with a custom template parser
    pub fn with_parser(config: &Config, parser: impl TemplateParser + 'static) -> Self {
        let mut registry = HostRegistry::new();
        registry.define(config.defines.clone());
        Self {
            parser: Box::new(parser),
            registry,
            script: None,
            domain: config.domain.clone(),
            logdir: config.logdir.clone(),
            overwrite_logs: config.overwrite_logs,
        }
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn add_host(
        &mut self,
        host: &str,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        self.registry.add_host(host, resolver)
    }

    pub fn add_hosts<I, S>(
        &mut self,
        hosts: I,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.add_hosts(hosts, resolver)
    }

    pub fn add_hosts_from_file(
        &mut self,
        path: &Path,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        self.registry.add_hosts_from_file(path, resolver)
    }

    pub fn add_hosts_from_tabular(
        &mut self,
        path: &Path,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        self.registry.add_hosts_from_tabular(path, resolver)
    }

    /// Define variables visible to every host
    pub fn define<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.registry.define(vars);
    }

    /// Define variables visible only while connected to `hostname`
    pub fn define_host<I, K, V>(&mut self, hostname: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.registry.define_host(hostname, vars);
    }

    /// Load script code; must happen before `compile` or `run`
    ///
    /// `__filename__` is empty for scripts loaded from a string.
    ///
    /// The code is parsed once against the variables of the first registered
    /// host (or the global defines when there is none) to catch errors early.
    pub fn load(&mut self, code: &str) -> Result<(), RunnerError> {
        self.load_script(code, None)
    }

    /// Read a script file and load it
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), RunnerError> {
        let code = fs::read_to_string(path).map_err(|source| RunnerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_script(&code, Some(path.to_path_buf()))
    }

    fn load_script(&mut self, code: &str, filename: Option<PathBuf>) -> Result<(), RunnerError> {
        let mut vars = match self.registry.hosts().first() {
            Some(entry) => {
                let url = HostUrl::parse(&entry.raw, DEFAULT_PROTOCOL)?;
                self.registry
                    .variables()
                    .merge(&url.hostname, &entry.url_vars, &self.domain)
            }
            None => self.registry.variables().merge("", &Variables::new(), ""),
        };
        inject_reserved(&mut vars, filename.as_deref(), "", None);

        self.parser.parse(code, &vars)?;
        tracing::debug!("Loaded script ({} bytes)", code.len());
        self.script = Some(LoadedScript {
            code: code.to_string(),
            filename,
        });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.script.is_some()
    }

    /// Compile and submit a sequence for every registered host
    ///
    /// A queue slot is reserved before each host is compiled, so at most
    /// `2 × max_threads` compiled sequences exist at any time. Hosts with an
    /// unsupported protocol are skipped and hosts whose script fails to
    /// compile are recorded as failed; neither stops the run. Calling this
    /// before `load` fails.
    pub async fn run<R: SequenceRunner>(
        &self,
        queue: &mut WorkQueue<R>,
        options: &RunOptions,
    ) -> Result<DispatchSummary, RunnerError> {
        if self.script.is_none() {
            return Err(RunnerError::NotLoaded);
        }

        let hosts: Vec<HostEntry> = self.registry.hosts().to_vec();
        let mut summary = DispatchSummary::default();

        for entry in &hosts {
            let slot = queue.reserve().await?;
            tracing::debug!("Building sequence for {}.", entry.raw);
            match self.compile(&*queue, entry, options) {
                Ok(Some(sequence)) => {
                    queue.submit(slot, sequence);
                    summary.submitted += 1;
                }
                Ok(None) => summary.skipped.push(entry.raw.clone()),
                Err(RunnerError::Template(e)) => {
                    tracing::warn!("Failed to compile script for {}: {}", entry.raw, e);
                    summary.failed.push((entry.raw.clone(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Dispatched {} sequences, skipped {} hosts, {} failed to compile",
            summary.submitted,
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Add the reserved variables; they override user definitions
fn inject_reserved(
    vars: &mut Variables,
    filename: Option<&Path>,
    runner: &str,
    parent: Option<&str>,
) {
    let filename = filename.map(|p| p.display().to_string()).unwrap_or_default();
    vars.insert(FILENAME_VAR.to_string(), vec![filename]);
    vars.insert(RUNNER_VAR.to_string(), vec![runner.to_string()]);
    vars.insert(
        PARENT_VAR.to_string(),
        vec![parent.unwrap_or_default().to_string()],
    );
}
