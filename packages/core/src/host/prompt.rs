//! Interactive placeholder resolution
//!
//! A host variable written as `{label}` is asked for when the host is
//! registered. The asking is delegated to a [`CredentialResolver`] so the
//! CLI can prompt on the terminal while tests answer programmatically.

use std::sync::LazyLock;

use regex::Regex;

use super::error::HostError;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([^}]*)\}$").expect("valid placeholder regex"));

/// A value the resolver is asked to supply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRequest {
    /// Variable name the value belongs to
    pub key: String,
    /// Human readable description shown to the user
    pub label: String,
}

impl PlaceholderRequest {
    /// Build a request if `value` is a `{label}` placeholder
    pub fn from_value(key: &str, value: &str) -> Option<Self> {
        let captures = PLACEHOLDER_RE.captures(value)?;
        let label = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("a value for \"{key}\""));
        Some(Self {
            key: key.to_string(),
            label,
        })
    }

    /// Prompt text for terminal resolvers
    pub fn prompt(&self) -> String {
        format!("Please enter {}", self.label)
    }

    /// Whether the value should be read without echo
    pub fn is_secret(&self) -> bool {
        let haystack = format!("{} {}", self.key, self.label).to_lowercase();
        ["password", "passwd", "secret", "pass"]
            .iter()
            .any(|needle| haystack.contains(needle))
    }
}

/// Supplies literal values for interactive placeholders
pub trait CredentialResolver {
    fn resolve(&mut self, request: &PlaceholderRequest) -> Result<String, HostError>;
}

impl<F> CredentialResolver for F
where
    F: FnMut(&PlaceholderRequest) -> Result<String, HostError>,
{
    fn resolve(&mut self, request: &PlaceholderRequest) -> Result<String, HostError> {
        self(request)
    }
}

/// Resolver for non-interactive runs: every placeholder is an error
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl CredentialResolver for NoPrompt {
    fn resolve(&mut self, request: &PlaceholderRequest) -> Result<String, HostError> {
        Err(HostError::Prompt {
            key: request.key.clone(),
            reason: "interactive input is disabled".to_string(),
        })
    }
}
