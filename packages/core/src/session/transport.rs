//! Protocol transports
//!
//! A transport carries one session to one host. [`ProcessTransport`] drives
//! the system `ssh` or `telnet` client through its standard streams;
//! [`DryRunTransport`] only records what would have been sent.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};

use super::error::TransportError;
use super::sequence::{Authentication, ConnectSpec, Protocol, SshVersion};

/// One session with a remote host
pub trait Transport: Send {
    fn connect(&mut self, spec: &ConnectSpec) -> Result<(), TransportError>;

    fn authenticate(&mut self, auth: &Authentication) -> Result<(), TransportError>;

    /// Send one command
    fn execute(&mut self, command: &str) -> Result<(), TransportError>;

    /// End the session and return its transcript
    fn close(&mut self) -> Result<String, TransportError>;
}

/// Transport backed by the system `ssh` / `telnet` client
///
/// The client is spawned on first use, once connect and authenticate
/// parameters are known. Commands are written to its stdin; output is
/// collected when the session is closed. Implements Drop so a failed
/// session never leaves the client running.
///
/// Commands are streamed without reading prompts in between, so
/// [`Authentication::wait`] has no effect on this transport.
#[derive(Default)]
pub struct ProcessTransport {
    spec: Option<ConnectSpec>,
    auth: Option<Authentication>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl ProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn spec(&self) -> Result<&ConnectSpec, TransportError> {
        self.spec.as_ref().ok_or(TransportError::NotConnected)
    }

    fn build_command(spec: &ConnectSpec, auth: Option<&Authentication>) -> Command {
        match spec.protocol {
            Protocol::Telnet => {
                let mut cmd = Command::new("telnet");
                cmd.arg(&spec.host);
                if let Some(port) = spec.port {
                    cmd.arg(port.to_string());
                }
                cmd
            }
            Protocol::Ssh { version } => {
                let mut cmd = Command::new("ssh");

                // Suppress prompts, fail fast on auth issues
                cmd.arg("-o").arg("BatchMode=yes");
                cmd.arg("-o").arg("ConnectTimeout=10");
                if spec.auto_verify {
                    cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
                }
                match version {
                    Some(SshVersion::V1) => {
                        cmd.arg("-1");
                    }
                    Some(SshVersion::V2) => {
                        cmd.arg("-2");
                    }
                    None => {}
                }
                if let Some(port) = spec.port {
                    cmd.arg("-p").arg(port.to_string());
                }
                if let Some(Authentication::Key { key_file, .. }) = auth {
                    cmd.arg("-i").arg(key_file);
                }
                if let Some(user) = auth.and_then(Authentication::user) {
                    cmd.arg("-l").arg(user);
                }
                cmd.arg(&spec.host);
                cmd
            }
        }
    }

    fn ensure_started(&mut self) -> Result<&mut ChildStdin, TransportError> {
        if self.child.is_none() {
            let spec = self.spec()?.clone();
            let mut cmd = Self::build_command(&spec, self.auth.as_ref());
            cmd.stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let client = match spec.protocol {
                Protocol::Telnet => "telnet",
                Protocol::Ssh { .. } => "ssh",
            };
            tracing::debug!("Spawning {} session to {}", client, spec.host);

            let mut child = cmd.spawn().map_err(|e| TransportError::Spawn {
                client: client.to_string(),
                reason: if e.kind() == std::io::ErrorKind::NotFound {
                    format!("{client} not found in PATH")
                } else {
                    e.to_string()
                },
            })?;
            self.stdin = child.stdin.take();
            self.child = Some(child);

            if let (Protocol::Telnet, Some(Authentication::Password { user, password, .. })) =
                (spec.protocol, self.auth.clone())
            {
                for line in [user, password].into_iter().flatten() {
                    self.write_line(&line)?;
                }
            }
        }
        self.stdin.as_mut().ok_or(TransportError::NotConnected)
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let host = self.spec()?.host.clone();
        let stdin = self.stdin.as_mut().ok_or(TransportError::NotConnected)?;
        writeln!(stdin, "{line}").map_err(|e| TransportError::ConnectionFailed {
            host,
            reason: e.to_string(),
        })
    }
}

impl Transport for ProcessTransport {
    fn connect(&mut self, spec: &ConnectSpec) -> Result<(), TransportError> {
        self.spec = Some(spec.clone());
        Ok(())
    }

    fn authenticate(&mut self, auth: &Authentication) -> Result<(), TransportError> {
        if let (Some(spec), Authentication::Password { password: Some(_), .. }) = (&self.spec, auth)
        {
            if matches!(spec.protocol, Protocol::Ssh { .. }) {
                tracing::warn!(
                    "ssh client cannot take a password non-interactively; {} must accept agent or key authentication",
                    spec.host
                );
            }
        }
        self.auth = Some(auth.clone());
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<(), TransportError> {
        self.ensure_started()?;
        self.write_line(command)
    }

    fn close(&mut self) -> Result<String, TransportError> {
        self.ensure_started()?;
        let spec = self.spec()?.clone();
        // Closing stdin ends the remote session
        drop(self.stdin.take());

        let child = self.child.take().ok_or(TransportError::NotConnected)?;
        let output = child
            .wait_with_output()
            .map_err(|e| TransportError::ConnectionFailed {
                host: spec.host.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if spec.echo {
            print!("{stdout}");
        }
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("Permission denied") || stderr.contains("Login incorrect") {
            return Err(TransportError::AuthFailed { host: spec.host });
        }
        Err(TransportError::ConnectionFailed {
            host: spec.host,
            reason: stderr.trim().to_string(),
        })
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::debug!("Killing unfinished session client");
            if let Err(e) = child.kill() {
                // Process may have already exited
                tracing::debug!("Session client kill result: {}", e);
            }
            // Wait to reap the zombie process
            let _ = child.wait();
        }
    }
}

/// Transport that records the session instead of opening it
#[derive(Debug, Clone, Default)]
pub struct DryRunTransport {
    lines: Vec<String>,
    echo: bool,
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every recorded line to a shared journal
    pub fn with_journal(journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    fn record(&mut self, line: String) {
        if self.echo {
            println!("{line}");
        }
        if let Some(journal) = &self.journal {
            if let Ok(mut guard) = journal.lock() {
                guard.push(line.clone());
            }
        }
        self.lines.push(line);
    }
}

impl Transport for DryRunTransport {
    fn connect(&mut self, spec: &ConnectSpec) -> Result<(), TransportError> {
        self.echo = spec.echo;
        let port = spec.port.map(|p| format!(":{p}")).unwrap_or_default();
        self.record(format!("connect {}://{}{}", spec.protocol, spec.host, port));
        Ok(())
    }

    fn authenticate(&mut self, auth: &Authentication) -> Result<(), TransportError> {
        let user = auth.user().unwrap_or("<none>");
        let mut line = match auth {
            Authentication::Password { .. } => format!("authenticate {user} with password"),
            Authentication::Key { key_file, .. } => {
                format!("authenticate {user} with key {}", key_file.display())
            }
        };
        if !auth.wait() {
            line.push_str(", no prompt wait");
        }
        self.record(line);
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<(), TransportError> {
        self.record(format!("> {command}"));
        Ok(())
    }

    fn close(&mut self) -> Result<String, TransportError> {
        self.record("close".to_string());
        Ok(self.lines.join("\n") + "\n")
    }
}
