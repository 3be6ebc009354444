//! Session-specific error types
//!
//! Errors that can occur while executing a sequence against a host.

use thiserror::Error;

use crate::template::TemplateError;

/// Errors raised by a transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to spawn the protocol client
    #[error("Failed to spawn {client}: {reason}")]
    Spawn { client: String, reason: String },

    /// Connection or session I/O failed
    #[error("Connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    /// Remote side rejected the credentials
    #[error("Authentication failed for {host}")]
    AuthFailed { host: String },

    /// Action requires an open connection
    #[error("Not connected")]
    NotConnected,
}

/// Errors raised while running a sequence
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Script failed: {0}")]
    Script(#[from] TemplateError),
}
