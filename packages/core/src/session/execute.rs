//! Sequence execution
//!
//! Runs the actions of a [`Sequence`] against a transport and writes the
//! per-host log files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::error::{SessionError, TransportError};
use super::sequence::{Action, ConnectSpec, Sequence, SequenceLog};
use super::transport::Transport;

/// Outcome of one executed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    /// Sequence name (the effective hostname)
    pub host: String,
    /// Number of script commands sent
    pub commands: usize,
    /// Failure message, `None` on success
    pub error: Option<String>,
}

impl SequenceReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Executes sequences; called on a blocking worker thread
pub trait SequenceRunner: Send + Sync + 'static {
    fn run(&self, sequence: Sequence) -> SequenceReport;
}

/// Runs sequences over transports produced by a factory
pub struct SessionRunner<F> {
    factory: F,
}

impl<F> SessionRunner<F>
where
    F: Fn(&ConnectSpec) -> Box<dyn Transport> + Send + Sync + 'static,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    fn execute(&self, sequence: &Sequence, session: &mut Session) -> Result<(), SessionError> {
        for action in sequence.actions() {
            tracing::trace!("{}: {}", sequence.name(), action.name());
            match action {
                Action::Connect(spec) => {
                    let mut opened = (self.factory)(spec);
                    opened.connect(spec)?;
                    session.transport = Some(opened);
                }
                Action::Authenticate(auth) => session.active()?.authenticate(auth)?,
                Action::RunScript(script) => {
                    let lines = script.commands()?;
                    for line in &lines {
                        session.active()?.execute(line)?;
                        session.commands += 1;
                    }
                }
                Action::Close => {
                    let output = session.active()?.close()?;
                    session.transcript.push_str(&output);
                    session.transport = None;
                }
            }
        }
        Ok(())
    }
}

/// State of a sequence while it runs
#[derive(Default)]
struct Session {
    transport: Option<Box<dyn Transport>>,
    commands: usize,
    transcript: String,
}

impl Session {
    fn active(&mut self) -> Result<&mut (dyn Transport + 'static), TransportError> {
        self.transport
            .as_deref_mut()
            .ok_or(TransportError::NotConnected)
    }

    /// Close a transport left open by a failed action, keeping its output
    fn salvage(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            match transport.close() {
                Ok(output) => self.transcript.push_str(&output),
                Err(e) => tracing::debug!("Closing failed session: {}", e),
            }
        }
    }
}

impl<F> SequenceRunner for SessionRunner<F>
where
    F: Fn(&ConnectSpec) -> Box<dyn Transport> + Send + Sync + 'static,
{
    fn run(&self, sequence: Sequence) -> SequenceReport {
        let host = sequence.name().to_string();
        let mut session = Session::default();
        let result = self.execute(&sequence, &mut session);

        let error = match result {
            Ok(()) => {
                if let Some(log) = sequence.log() {
                    write_log(&log.logfile, log.overwrite, &session.transcript);
                }
                tracing::debug!("{}: finished ({} commands)", host, session.commands);
                None
            }
            Err(e) => {
                session.salvage();
                let message = e.to_string();
                if let Some(log) = sequence.log() {
                    if !session.transcript.is_empty() {
                        write_log(&log.logfile, log.overwrite, &session.transcript);
                    }
                    write_error_log(log, &message);
                }
                tracing::warn!("{}: {}", host, message);
                Some(message)
            }
        };

        SequenceReport {
            host,
            commands: session.commands,
            error,
        }
    }
}

fn write_error_log(log: &SequenceLog, message: &str) {
    write_log(&log.error_logfile, log.overwrite, &format!("{message}\n"));
}

fn write_log(path: &Path, overwrite: bool, contents: &str) {
    let result = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(overwrite)
        .append(!overwrite)
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()));
    if let Err(e) = result {
        tracing::warn!("Failed to write log {}: {}", path.display(), e);
    }
}
