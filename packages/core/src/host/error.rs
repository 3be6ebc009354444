//! Host-specific error types
//!
//! Errors that can occur while registering hosts and reading host lists.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during host registration
#[derive(Error, Debug)]
pub enum HostError {
    /// Host list or tabular file does not exist
    #[error("No such file: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Failed to read a host list file
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed tabular host file
    #[error("Syntax error in CSV file header: {0}")]
    Syntax(String),

    /// Host string could not be parsed as a host URL
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// Interactive placeholder could not be resolved
    #[error("Failed to read a value for '{key}': {reason}")]
    Prompt { key: String, reason: String },
}

impl HostError {
    pub(crate) fn invalid_host(host: &str, reason: impl Into<String>) -> Self {
        Self::InvalidHost {
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}
