//! Host sessions
//!
//! Sequences describe what to do with one host; transports and the
//! session runner carry them out.

mod error;
mod execute;
mod sequence;
mod transport;

pub use error::{SessionError, TransportError};
pub use execute::{SequenceReport, SequenceRunner, SessionRunner};
pub use sequence::{
    Action, Authentication, ConnectSpec, Protocol, Sequence, SequenceLog, SshVersion,
};
pub use transport::{DryRunTransport, ProcessTransport, Transport};
