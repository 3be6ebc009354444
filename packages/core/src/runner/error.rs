//! Runner-specific error types

use std::path::PathBuf;

use thiserror::Error;

use crate::host::HostError;
use crate::queue::QueueError;
use crate::template::TemplateError;

/// Errors that abort a load, compile or run call
#[derive(Error, Debug)]
pub enum RunnerError {
    /// `compile` or `run` called before a script was loaded
    #[error("A script was not yet loaded using load()")]
    NotLoaded,

    /// Script file could not be read
    #[error("Failed to read script {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Script error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
