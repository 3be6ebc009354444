//! Configuration schema for termrun
//!
//! Defines the structure and defaults for the config.json file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::session::Protocol;

/// Main configuration structure for termrun
///
/// Serialized to/from `~/.config/termrun/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Config file version for migrations
    pub version: u32,

    /// Domain appended to hostnames without a dot (default: none)
    #[serde(default)]
    pub domain: String,

    /// Directory for per-host session logs (default: no logs)
    #[serde(default)]
    pub logdir: Option<PathBuf>,

    /// Truncate existing session logs instead of appending (default: false)
    #[serde(default)]
    pub overwrite_logs: bool,

    /// Sessions running in parallel (default: 1)
    /// Terminal echo is only enabled when this is 1
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Protocol for host strings without a scheme (default: "telnet")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Variables defined for every host (default: empty)
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
}

fn default_max_threads() -> usize {
    1
}

fn default_protocol() -> String {
    "telnet".to_string()
}

/// Validate a protocol name
///
/// Accepts "telnet", "ssh", "ssh1" and "ssh2".
pub fn validate_protocol(protocol: &str) -> Result<Protocol, String> {
    Protocol::from_scheme(protocol.trim()).ok_or_else(|| {
        format!(
            "Unsupported protocol: '{}'. Use telnet, ssh, ssh1 or ssh2",
            protocol
        )
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            domain: String::new(),
            logdir: None,
            overwrite_logs: false,
            max_threads: default_max_threads(),
            protocol: default_protocol(),
            defines: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every field that has a restricted value range
    pub fn validate(&self) -> Result<(), String> {
        if self.max_threads == 0 {
            return Err("max_threads must be at least 1".to_string());
        }
        validate_protocol(&self.protocol)?;
        Ok(())
    }
}
