//! Script templates
//!
//! The runner only depends on the [`TemplateParser`] and [`ScriptInstance`]
//! traits. Every compiled sequence asks the parser for a fresh instance, so
//! no mutable script state is shared between hosts.
//! [`LineTemplateParser`] is the built-in implementation.

mod error;
mod line;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::TemplateError;
pub use line::{LineScript, LineTemplateParser};

use crate::vars::{FILENAME_VAR, PARENT_VAR, RUNNER_VAR, Variables};

/// Turns script text plus variables into an executable script instance
pub trait TemplateParser: Send + Sync {
    fn parse(&self, text: &str, vars: &Variables)
    -> Result<Box<dyn ScriptInstance>, TemplateError>;

    fn parse_file(
        &self,
        path: &Path,
        vars: &Variables,
    ) -> Result<Box<dyn ScriptInstance>, TemplateError> {
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&text, vars)
    }
}

/// A parsed script bound to one host's variables
pub trait ScriptInstance: Send + fmt::Debug {
    /// Define or replace a variable
    fn define(&mut self, key: &str, values: Vec<String>);

    /// Current value of a variable
    fn get(&self, key: &str) -> Option<&[String]>;

    /// Attach the reserved context variables
    fn bind(&mut self, bindings: &ScriptBindings) {
        let filename = bindings
            .filename
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.define(FILENAME_VAR, vec![filename]);
        self.define(RUNNER_VAR, vec![bindings.runner.clone()]);
        self.define(
            PARENT_VAR,
            vec![bindings.parent.clone().unwrap_or_default()],
        );
    }

    /// Commands to send to the remote host, in order
    fn commands(&self) -> Result<Vec<String>, TemplateError>;
}

/// Context a script instance is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBindings {
    /// Source file of the script, if it was loaded from one
    pub filename: Option<PathBuf>,
    /// Name of the run context executing the script
    pub runner: String,
    /// Name of the enclosing script, if any
    pub parent: Option<String>,
}
