//! Host registry
//!
//! Accumulates target hosts in registration order, from direct additions,
//! plain host lists and tab-separated tables with per-host variables.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::error::HostError;
use super::prompt::{CredentialResolver, PlaceholderRequest};
use super::url::HostUrl;
use crate::vars::{VariableStore, Variables};

static TABULAR_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hostname(?:\t[^\t]+)*$").expect("valid header regex"));

/// Scheme used when a host string carries none
pub const DEFAULT_PROTOCOL: &str = "telnet";

/// One registered host
///
/// Adding the same host string twice yields two entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Host string as given
    pub raw: String,
    /// Query variables of the host string, placeholders already resolved
    pub url_vars: Variables,
}

/// Ordered list of hosts plus the variable scopes attached to them
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    hosts: Vec<HostEntry>,
    vars: VariableStore,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single host string
    ///
    /// Every `{label}` query value is replaced by what `resolver` returns
    /// before the host is stored.
    pub fn add_host(
        &mut self,
        raw: &str,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        let url = HostUrl::parse(raw, DEFAULT_PROTOCOL)?;
        let mut url_vars = url.vars;

        for (key, values) in url_vars.iter_mut() {
            for value in values.iter_mut() {
                if let Some(request) = PlaceholderRequest::from_value(key, value) {
                    *value = resolver.resolve(&request)?;
                }
            }
        }

        tracing::debug!("Registered host {} ({})", raw, url.hostname);
        self.hosts.push(HostEntry {
            raw: raw.to_string(),
            url_vars,
        });
        Ok(())
    }

    /// Register several hosts in order
    ///
    /// Stops at the first failure; hosts added before it stay registered.
    pub fn add_hosts<I, S>(
        &mut self,
        hosts: I,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for host in hosts {
            self.add_host(host.as_ref(), resolver)?;
        }
        Ok(())
    }

    /// Register one host per non-blank line of `path`
    pub fn add_hosts_from_file(
        &mut self,
        path: &Path,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        let contents = read_host_file(path)?;
        let before = self.hosts.len();
        for line in contents.lines() {
            let host = line.trim();
            if host.is_empty() {
                continue;
            }
            self.add_host(host, resolver)?;
        }
        tracing::debug!(
            "Loaded {} hosts from {}",
            self.hosts.len() - before,
            path.display()
        );
        Ok(())
    }

    /// Register hosts and per-host variables from a tab-separated table
    ///
    /// The header is `hostname` followed by variable names. Rows for the same
    /// host must be adjacent: each row appends its column values to that
    /// host's variable lists, and only the first row of a run adds the host.
    pub fn add_hosts_from_tabular(
        &mut self,
        path: &Path,
        resolver: &mut dyn CredentialResolver,
    ) -> Result<(), HostError> {
        let contents = read_host_file(path)?;
        let mut lines = contents.lines();

        let header = lines.next().unwrap_or_default().trim_end();
        if !header.starts_with("hostname")
            || header[8..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
        {
            return Err(HostError::Syntax(
                "File does not start with \"hostname\".".to_string(),
            ));
        }
        if !TABULAR_HEADER_RE.is_match(header) {
            return Err(HostError::Syntax(
                "Make sure to separate columns by tabs.".to_string(),
            ));
        }
        let varnames: Vec<&str> = header.split('\t').skip(1).collect();

        let mut last_hostname = String::new();
        let mut seen = HashSet::new();
        for line in lines {
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let raw = fields.next().unwrap_or_default().trim();
            let hostname = HostUrl::parse(raw, DEFAULT_PROTOCOL)?.hostname;

            if hostname != last_hostname {
                if !seen.insert(hostname.clone()) {
                    tracing::warn!(
                        "Host {} appears again in {} after other hosts; it will run twice",
                        hostname,
                        path.display()
                    );
                }
                self.add_host(raw, resolver)?;
                last_hostname = hostname.clone();
            }

            let values: Vec<&str> = fields.collect();
            for (i, varname) in varnames.iter().enumerate() {
                let value = values.get(i).copied().unwrap_or_default();
                self.vars.append_host_value(&hostname, varname, value);
            }
        }
        Ok(())
    }

    /// Define variables visible to every host
    pub fn define<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.define(vars);
    }

    /// Define variables for one hostname, replacing earlier values
    pub fn define_host<I, K, V>(&mut self, hostname: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.define_host(hostname, vars);
    }

    pub fn hosts(&self) -> &[HostEntry] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    /// Overlay variables defined for a hostname
    pub fn overlay(&self, hostname: &str) -> Option<&Variables> {
        self.vars.overlay(hostname)
    }
}

fn read_host_file(path: &Path) -> Result<String, HostError> {
    if !path.exists() {
        return Err(HostError::FileNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| HostError::Read {
        path: path.to_path_buf(),
        source,
    })
}
