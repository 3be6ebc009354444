//! termrun-core - Core library for termrun
//!
//! Runs a templated command script against many Telnet/SSH hosts: hosts and
//! their variables are collected in a [`HostRegistry`], the [`Runner`]
//! compiles one session [`Sequence`] per host and feeds them to a bounded
//! [`WorkQueue`].

pub mod config;
pub mod host;
pub mod queue;
pub mod runner;
pub mod session;
pub mod template;
pub mod vars;
pub mod version;

pub use config::{Config, load_config, load_config_from, save_config, validate_protocol};
pub use host::{
    CredentialResolver, HostEntry, HostError, HostRegistry, NoPrompt, PlaceholderRequest,
};
pub use queue::{QueueError, WorkQueue};
pub use runner::{DispatchSummary, RunContext, RunOptions, Runner, RunnerError};
pub use session::{
    DryRunTransport, ProcessTransport, Sequence, SequenceReport, SequenceRunner, SessionRunner,
    Transport,
};
pub use template::{LineTemplateParser, ScriptInstance, TemplateError, TemplateParser};
pub use vars::{VariableStore, Variables};
pub use version::{get_version, get_version_long};
