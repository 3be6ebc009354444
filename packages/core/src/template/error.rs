//! Template-specific error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing or rendering a script template
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Script file could not be read
    #[error("Failed to read script {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed template syntax
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Reference to a variable that is not defined
    #[error("Undefined variable '{name}' on line {line}")]
    Undefined { line: usize, name: String },
}
