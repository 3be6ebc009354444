//! Session sequences
//!
//! A sequence is the ordered list of actions run against one host:
//! connect, optionally authenticate, run the script, close.

use std::fmt;
use std::path::PathBuf;

use crate::template::ScriptInstance;

/// SSH protocol version to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshVersion {
    V1,
    V2,
}

/// Transport protocol of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Telnet,
    /// `version: None` lets the client negotiate
    Ssh { version: Option<SshVersion> },
}

impl Protocol {
    /// Map a host string scheme to a protocol
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "telnet" => Some(Self::Telnet),
            "ssh" => Some(Self::Ssh { version: None }),
            "ssh1" => Some(Self::Ssh {
                version: Some(SshVersion::V1),
            }),
            "ssh2" => Some(Self::Ssh {
                version: Some(SshVersion::V2),
            }),
            _ => None,
        }
    }

    pub fn ssh_version(&self) -> Option<SshVersion> {
        match self {
            Self::Telnet => None,
            Self::Ssh { version } => *version,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telnet => write!(f, "telnet"),
            Self::Ssh { version: None } => write!(f, "ssh"),
            Self::Ssh {
                version: Some(SshVersion::V1),
            } => write!(f, "ssh1"),
            Self::Ssh {
                version: Some(SshVersion::V2),
            } => write!(f, "ssh2"),
        }
    }
}

/// Parameters of the connect action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSpec {
    pub protocol: Protocol,
    pub host: String,
    pub port: Option<u16>,
    /// Mirror session output on the terminal
    pub echo: bool,
    /// Accept unknown SSH host keys
    pub auto_verify: bool,
}

/// Credentials of the authenticate action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Password {
        user: Option<String>,
        password: Option<String>,
        /// Wait for a prompt after logging in; transports that stream
        /// commands without reading prompts ignore it
        wait: bool,
    },
    Key {
        user: Option<String>,
        key_file: PathBuf,
        wait: bool,
    },
}

impl Authentication {
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Password { user, .. } | Self::Key { user, .. } => user.as_deref(),
        }
    }

    pub fn wait(&self) -> bool {
        match self {
            Self::Password { wait, .. } | Self::Key { wait, .. } => *wait,
        }
    }
}

/// One step of a session
#[derive(Debug)]
pub enum Action {
    Connect(ConnectSpec),
    Authenticate(Authentication),
    RunScript(Box<dyn ScriptInstance>),
    Close,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Authenticate(_) => "authenticate",
            Self::RunScript(_) => "run-script",
            Self::Close => "close",
        }
    }
}

/// Per-host log files of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceLog {
    pub logfile: PathBuf,
    pub error_logfile: PathBuf,
    /// Truncate existing logs instead of appending
    pub overwrite: bool,
}

impl SequenceLog {
    /// `<logdir>/<host>.log` plus `<logdir>/<host>.log.error`
    pub fn in_dir(logdir: &std::path::Path, host: &str, overwrite: bool) -> Self {
        let logfile = logdir.join(format!("{host}.log"));
        let error_logfile = logdir.join(format!("{host}.log.error"));
        Self {
            logfile,
            error_logfile,
            overwrite,
        }
    }
}

/// Ordered actions for one host
#[derive(Debug)]
pub struct Sequence {
    name: String,
    actions: Vec<Action>,
    log: Option<SequenceLog>,
}

impl Sequence {
    /// Build `connect, [authenticate], run-script, close`
    pub fn new(
        name: impl Into<String>,
        connect: ConnectSpec,
        authentication: Option<Authentication>,
        script: Box<dyn ScriptInstance>,
    ) -> Self {
        let mut actions = vec![Action::Connect(connect)];
        if let Some(auth) = authentication {
            actions.push(Action::Authenticate(auth));
        }
        actions.push(Action::RunScript(script));
        actions.push(Action::Close);
        Self {
            name: name.into(),
            actions,
            log: None,
        }
    }

    /// Attach per-host log files
    pub fn with_log(mut self, log: SequenceLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn log(&self) -> Option<&SequenceLog> {
        self.log.as_ref()
    }

    /// The connect action, always first
    pub fn connect(&self) -> Option<&ConnectSpec> {
        match self.actions.first() {
            Some(Action::Connect(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.actions.iter().find_map(|action| match action {
            Action::Authenticate(auth) => Some(auth),
            _ => None,
        })
    }

    pub fn script(&self) -> Option<&dyn ScriptInstance> {
        self.actions.iter().find_map(|action| match action {
            Action::RunScript(script) => Some(script.as_ref()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::LineScript;
    use crate::vars::Variables;

    fn connect() -> ConnectSpec {
        ConnectSpec {
            protocol: Protocol::Telnet,
            host: "r1".to_string(),
            port: None,
            echo: false,
            auto_verify: false,
        }
    }

    fn script() -> Box<dyn ScriptInstance> {
        Box::new(LineScript::parse("show version", &Variables::new()).unwrap())
    }

    #[test]
    fn test_protocol_from_scheme() {
        assert_eq!(Protocol::from_scheme("telnet"), Some(Protocol::Telnet));
        assert_eq!(
            Protocol::from_scheme("ssh"),
            Some(Protocol::Ssh { version: None })
        );
        assert_eq!(
            Protocol::from_scheme("ssh1").and_then(|p| p.ssh_version()),
            Some(SshVersion::V1)
        );
        assert_eq!(
            Protocol::from_scheme("ssh2").map(|p| p.to_string()),
            Some("ssh2".to_string())
        );
        assert_eq!(Protocol::from_scheme("ftp"), None);
    }

    #[test]
    fn test_sequence_order_with_authentication() {
        let auth = Authentication::Password {
            user: Some("admin".to_string()),
            password: None,
            wait: true,
        };
        let sequence = Sequence::new("r1", connect(), Some(auth), script());
        let names: Vec<_> = sequence.actions().iter().map(Action::name).collect();
        assert_eq!(names, vec!["connect", "authenticate", "run-script", "close"]);
        assert_eq!(sequence.authentication().and_then(|a| a.user()), Some("admin"));
    }

    #[test]
    fn test_sequence_order_without_authentication() {
        let sequence = Sequence::new("r1", connect(), None, script());
        let names: Vec<_> = sequence.actions().iter().map(Action::name).collect();
        assert_eq!(names, vec!["connect", "run-script", "close"]);
        assert!(sequence.log().is_none());
    }

    #[test]
    fn test_log_paths() {
        let log = SequenceLog::in_dir(std::path::Path::new("/var/log/tr"), "r1.lab", true);
        assert_eq!(log.logfile, PathBuf::from("/var/log/tr/r1.lab.log"));
        assert_eq!(log.error_logfile, PathBuf::from("/var/log/tr/r1.lab.log.error"));
    }
}
