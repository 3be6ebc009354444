//! Per-run options
//!
//! Options that shape how each host's session is compiled. Usable both as
//! a clap argument group and as a serde structure; unknown keys are rejected.

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

/// Options recognized by the sequence compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Args)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RunOptions {
    /// Login name for hosts whose host string carries none
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for hosts whose host string carries none
    #[arg(long)]
    pub password: Option<String>,

    /// Protocol for host strings without a scheme (default: telnet)
    #[arg(long)]
    pub protocol: Option<String>,

    /// Never mirror session output on the terminal
    #[arg(long)]
    pub no_echo: bool,

    /// Authenticate with this private key instead of a password
    #[arg(long, value_name = "FILE")]
    pub ssh_key: Option<PathBuf>,

    /// Accept unknown SSH host keys
    #[arg(long)]
    pub ssh_auto_verify: bool,

    /// Do not wait for a prompt after logging in
    #[arg(long)]
    pub no_initial_prompt: bool,

    /// Do not wait for a prompt after any command
    #[arg(long)]
    pub no_prompt: bool,

    /// Skip the authentication step
    #[arg(long)]
    pub no_authentication: bool,

    /// Script file to compile instead of the loaded script
    #[arg(skip)]
    pub filename: Option<PathBuf>,

    /// Script code to compile instead of the loaded script
    #[arg(skip)]
    pub code: Option<String>,
}

impl RunOptions {
    /// Whether the session waits for a prompt
    pub fn wait_for_prompt(&self) -> bool {
        !self.no_initial_prompt && !self.no_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert!(options.protocol.is_none());
        assert!(!options.no_echo);
        assert!(options.wait_for_prompt());
    }

    #[test]
    fn test_kebab_case_keys() {
        let json = r#"{"user": "ops", "no-echo": true, "ssh-key": "/keys/id", "no-prompt": true}"#;
        let options: RunOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.user.as_deref(), Some("ops"));
        assert!(options.no_echo);
        assert_eq!(options.ssh_key, Some(PathBuf::from("/keys/id")));
        assert!(!options.wait_for_prompt());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let json = r#"{"user": "ops", "no-ecoh": true}"#;
        assert!(serde_json::from_str::<RunOptions>(json).is_err());
    }
}
