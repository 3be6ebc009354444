//! Sequence compiler

use super::{RunContext, Runner, RunnerError, RunOptions, inject_reserved};
use crate::host::{DEFAULT_PROTOCOL, HostEntry, HostUrl};
use crate::session::{Authentication, ConnectSpec, Protocol, Sequence, SequenceLog};
use crate::template::ScriptBindings;

impl Runner {
    /// Compile the session sequence for one registered host
    ///
    /// Returns `Ok(None)` when the host's protocol is not supported; the
    /// caller skips such hosts. Every call parses a fresh script instance.
    pub fn compile(
        &self,
        ctx: &dyn RunContext,
        entry: &HostEntry,
        options: &RunOptions,
    ) -> Result<Option<Sequence>, RunnerError> {
        let loaded = self.script.as_ref().ok_or(RunnerError::NotLoaded)?;

        let default_protocol = options.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
        let url = HostUrl::parse(&entry.raw, default_protocol)?;

        let mut vars = self
            .registry
            .variables()
            .merge(&url.hostname, &entry.url_vars, &self.domain);
        let hostname = crate::vars::qualify_hostname(&url.hostname, &self.domain);

        let user = url.username.clone().or_else(|| options.user.clone());
        let password = url.password.clone().or_else(|| options.password.clone());

        let filename = options
            .filename
            .clone()
            .or_else(|| loaded.filename.clone());
        inject_reserved(
            &mut vars,
            filename.as_deref(),
            ctx.name(),
            ctx.enclosing_script(),
        );

        let mut script = match (&options.filename, &options.code) {
            (Some(path), _) => self.parser.parse_file(path, &vars)?,
            (None, Some(code)) => self.parser.parse(code, &vars)?,
            (None, None) => self.parser.parse(&loaded.code, &vars)?,
        };
        script.bind(&ScriptBindings {
            filename,
            runner: ctx.name().to_string(),
            parent: ctx.enclosing_script().map(str::to_string),
        });

        let Some(protocol) = Protocol::from_scheme(&url.protocol) else {
            tracing::warn!("Unsupported protocol {} for {}", url.protocol, entry.raw);
            return Ok(None);
        };

        let echo = ctx.max_threads() == 1 && !options.no_echo;
        let wait = options.wait_for_prompt();

        let connect = ConnectSpec {
            protocol,
            host: hostname.clone(),
            port: url.port,
            echo,
            auto_verify: options.ssh_auto_verify,
        };

        let authentication = if options.no_authentication {
            None
        } else if let Some(key_file) = &options.ssh_key {
            Some(Authentication::Key {
                user,
                key_file: key_file.clone(),
                wait,
            })
        } else {
            Some(Authentication::Password {
                user,
                password,
                wait,
            })
        };

        let sequence = Sequence::new(&hostname, connect, authentication, script);
        let sequence = match &self.logdir {
            Some(logdir) => {
                sequence.with_log(SequenceLog::in_dir(logdir, &hostname, self.overwrite_logs))
            }
            None => sequence,
        };
        Ok(Some(sequence))
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::Config;
    use crate::host::NoPrompt;
    use crate::queue::WorkQueue;
    use crate::session::{
        Action, DryRunTransport, SequenceReport, SequenceRunner, SessionRunner, SshVersion, Transport,
    };
    use crate::vars::{FILENAME_VAR, HOSTNAME_VAR, RUNNER_VAR};

    struct TestContext {
        threads: usize,
    }

    impl RunContext for TestContext {
        fn max_threads(&self) -> usize {
            self.threads
        }

        fn name(&self) -> &str {
            "test-runner"
        }
    }

    fn config() -> Config {
        Config {
            domain: "example.com".to_string(),
            ..Config::default()
        }
    }

    fn runner_with(hosts: &[&str], script: &str) -> Runner {
        let mut runner = Runner::new(&config());
        runner.add_hosts(hosts, &mut NoPrompt).unwrap();
        runner.load(script).unwrap();
        runner
    }

    fn compile_first(runner: &Runner, threads: usize, options: &RunOptions) -> Option<Sequence> {
        let entry = runner.registry().hosts()[0].clone();
        runner
            .compile(&TestContext { threads }, &entry, options)
            .unwrap()
    }

    #[test]
    fn test_compile_before_load_fails() {
        let mut runner = Runner::new(&config());
        runner.add_host("r1", &mut NoPrompt).unwrap();
        let entry = runner.registry().hosts()[0].clone();

        let result = runner.compile(
            &TestContext { threads: 1 },
            &entry,
            &RunOptions::default(),
        );
        assert!(matches!(result, Err(RunnerError::NotLoaded)));
    }

    #[test]
    fn test_echo_follows_concurrency() {
        let runner = runner_with(&["r1"], "show version");

        let single = compile_first(&runner, 1, &RunOptions::default()).unwrap();
        assert!(single.connect().unwrap().echo);

        let parallel = compile_first(&runner, 4, &RunOptions::default()).unwrap();
        assert!(!parallel.connect().unwrap().echo);

        let options = RunOptions {
            no_echo: true,
            ..RunOptions::default()
        };
        let quiet = compile_first(&runner, 1, &options).unwrap();
        assert!(!quiet.connect().unwrap().echo);
    }

    #[test]
    fn test_unsupported_protocol_returns_none() {
        let runner = runner_with(&["ftp://r1"], "show version");
        assert!(compile_first(&runner, 1, &RunOptions::default()).is_none());
    }

    #[test]
    fn test_action_order_and_domain_suffix() {
        let runner = runner_with(&["ssh2://r1:2222"], "show version");
        let sequence = compile_first(&runner, 1, &RunOptions::default()).unwrap();

        let names: Vec<_> = sequence.actions().iter().map(Action::name).collect();
        assert_eq!(names, ["connect", "authenticate", "run-script", "close"]);

        let connect = sequence.connect().unwrap();
        assert_eq!(connect.host, "r1.example.com");
        assert_eq!(connect.port, Some(2222));
        assert_eq!(
            connect.protocol,
            Protocol::Ssh {
                version: Some(SshVersion::V2)
            }
        );
        assert_eq!(sequence.name(), "r1.example.com");
        assert_eq!(
            sequence.script().unwrap().get(HOSTNAME_VAR),
            Some(&["r1.example.com".to_string()][..])
        );
    }

    #[test]
    fn test_default_protocol_from_options() {
        let runner = runner_with(&["r1.lab"], "show version");
        let options = RunOptions {
            protocol: Some("ssh".to_string()),
            ..RunOptions::default()
        };
        let sequence = compile_first(&runner, 1, &options).unwrap();
        let connect = sequence.connect().unwrap();
        assert_eq!(connect.protocol, Protocol::Ssh { version: None });
        assert_eq!(connect.host, "r1.lab");
    }

    #[test]
    fn test_embedded_credentials_win() {
        let runner = runner_with(&["telnet://admin:secret@r1", "r2"], "show version");
        let options = RunOptions {
            user: Some("ops".to_string()),
            password: Some("fallback".to_string()),
            ..RunOptions::default()
        };
        let ctx = TestContext { threads: 1 };
        let hosts = runner.registry().hosts().to_vec();

        let first = runner.compile(&ctx, &hosts[0], &options).unwrap().unwrap();
        assert_eq!(
            first.authentication(),
            Some(&Authentication::Password {
                user: Some("admin".to_string()),
                password: Some("secret".to_string()),
                wait: true,
            })
        );

        let second = runner.compile(&ctx, &hosts[1], &options).unwrap().unwrap();
        assert_eq!(second.authentication().unwrap().user(), Some("ops"));
    }

    #[test]
    fn test_key_and_skipped_authentication() {
        let runner = runner_with(&["ssh://ops@r1"], "show version");

        let options = RunOptions {
            ssh_key: Some(PathBuf::from("/keys/id_ed25519")),
            no_prompt: true,
            ..RunOptions::default()
        };
        let sequence = compile_first(&runner, 1, &options).unwrap();
        assert_eq!(
            sequence.authentication(),
            Some(&Authentication::Key {
                user: Some("ops".to_string()),
                key_file: PathBuf::from("/keys/id_ed25519"),
                wait: false,
            })
        );

        let options = RunOptions {
            no_authentication: true,
            ..RunOptions::default()
        };
        let sequence = compile_first(&runner, 1, &options).unwrap();
        assert!(sequence.authentication().is_none());
        assert_eq!(sequence.actions().len(), 3);
    }

    #[test]
    fn test_log_paths_follow_logdir() {
        let mut config = config();
        config.logdir = Some(PathBuf::from("/var/log/termrun"));
        config.overwrite_logs = true;
        let mut runner = Runner::new(&config);
        runner.add_host("r1", &mut NoPrompt).unwrap();
        runner.load("show version").unwrap();

        let sequence = compile_first(&runner, 1, &RunOptions::default()).unwrap();
        let log = sequence.log().unwrap();
        assert_eq!(
            log.logfile,
            Path::new("/var/log/termrun/r1.example.com.log")
        );
        assert_eq!(
            log.error_logfile,
            Path::new("/var/log/termrun/r1.example.com.log.error")
        );
        assert!(log.overwrite);

        let plain = runner_with(&["r1"], "show version");
        assert!(compile_first(&plain, 1, &RunOptions::default()).unwrap().log().is_none());
    }

    #[test]
    fn test_fresh_script_per_sequence() {
        let runner = runner_with(&["r1", "r2"], "show interface $hostname");
        let ctx = TestContext { threads: 2 };
        let hosts = runner.registry().hosts().to_vec();
        let options = RunOptions::default();

        let first = runner.compile(&ctx, &hosts[0], &options).unwrap().unwrap();
        let second = runner.compile(&ctx, &hosts[1], &options).unwrap().unwrap();
        drop(first);

        assert_eq!(
            second.script().unwrap().commands().unwrap(),
            vec!["show interface r2.example.com".to_string()]
        );
        let again = runner.compile(&ctx, &hosts[0], &options).unwrap().unwrap();
        assert_eq!(
            again.script().unwrap().commands().unwrap(),
            vec!["show interface r1.example.com".to_string()]
        );
    }

    #[test]
    fn test_reserved_variables_are_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.txt");
        std::fs::write(&path, "copy running tftp://$hostname\n").unwrap();

        let mut runner = Runner::new(&config());
        runner.add_host("r1", &mut NoPrompt).unwrap();
        runner.define([("__runner__", "spoofed")]);
        runner.load_from_file(&path).unwrap();

        let sequence = compile_first(&runner, 1, &RunOptions::default()).unwrap();
        let script = sequence.script().unwrap();
        assert_eq!(
            script.get(FILENAME_VAR),
            Some(&[path.display().to_string()][..])
        );
        assert_eq!(script.get(RUNNER_VAR), Some(&["test-runner".to_string()][..]));
    }

    #[test]
    fn test_code_option_overrides_loaded_script() {
        let runner = runner_with(&["r1"], "show version");
        let options = RunOptions {
            code: Some("show clock".to_string()),
            ..RunOptions::default()
        };
        let sequence = compile_first(&runner, 1, &options).unwrap();
        assert_eq!(
            sequence.script().unwrap().commands().unwrap(),
            vec!["show clock".to_string()]
        );
    }

    #[test]
    fn test_load_rejects_undefined_variables() {
        let mut runner = Runner::new(&config());
        runner.add_host("r1", &mut NoPrompt).unwrap();
        let result = runner.load("show $missing");
        assert!(matches!(result, Err(RunnerError::Template(_))));
        assert!(!runner.is_loaded());
    }

    #[test]
    fn test_load_from_missing_file() {
        let mut runner = Runner::new(&config());
        let result = runner.load_from_file(Path::new("/nonexistent/script.txt"));
        assert!(matches!(result, Err(RunnerError::Read { .. })));
    }

    #[test]
    fn test_load_sees_tabular_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.tsv");
        std::fs::write(&path, "hostname\tvlan\nr1\t10\nr1\t20\n").unwrap();

        let mut runner = Runner::new(&config());
        runner
            .add_hosts_from_tabular(&path, &mut NoPrompt)
            .unwrap();
        runner.load("vlan $vlan").unwrap();

        let sequence = compile_first(&runner, 1, &RunOptions::default()).unwrap();
        assert_eq!(
            sequence.script().unwrap().commands().unwrap(),
            vec!["vlan 10".to_string(), "vlan 20".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_skips_unsupported_hosts() {
        let runner = runner_with(&["r1", "ftp://r2", "ssh://r3"], "show version");
        let journal = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&journal);
        let sessions = SessionRunner::new(move |_: &ConnectSpec| {
            Box::new(DryRunTransport::with_journal(Arc::clone(&sink))) as Box<dyn Transport>
        });
        let mut queue = WorkQueue::new(1, sessions);

        let summary = runner.run(&mut queue, &RunOptions::default()).await.unwrap();
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.skipped, vec!["ftp://r2".to_string()]);

        let reports = queue.join().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.is_success()));

        let journal = journal.lock().unwrap();
        assert!(journal.contains(&"connect telnet://r1.example.com".to_string()));
        assert!(journal.contains(&"connect ssh://r3.example.com".to_string()));
        assert_eq!(journal.iter().filter(|l| *l == "> show version").count(), 2);
    }

    #[tokio::test]
    async fn test_run_before_load_fails() {
        let mut runner = Runner::new(&config());
        runner.add_host("r1", &mut NoPrompt).unwrap();
        let sessions = SessionRunner::new(|_: &ConnectSpec| {
            Box::new(DryRunTransport::new()) as Box<dyn Transport>
        });
        let mut queue = WorkQueue::new(1, sessions);

        let result = runner.run(&mut queue, &RunOptions::default()).await;
        assert!(matches!(result, Err(RunnerError::NotLoaded)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_continues_after_compile_failure() {
        let runner = runner_with(&["r1?vlan=10", "r2", "r3?vlan=30"], "vlan $vlan");
        let journal = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&journal);
        let sessions = SessionRunner::new(move |_: &ConnectSpec| {
            Box::new(DryRunTransport::with_journal(Arc::clone(&sink))) as Box<dyn Transport>
        });
        let mut queue = WorkQueue::new(2, sessions);

        let summary = runner.run(&mut queue, &RunOptions::default()).await.unwrap();
        assert_eq!(summary.submitted, 2);
        assert!(summary.skipped.is_empty());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "r2");
        assert!(summary.failed[0].1.contains("vlan"));

        let mut hosts: Vec<String> = queue.join().await.into_iter().map(|r| r.host).collect();
        hosts.sort();
        assert_eq!(hosts, ["r1.example.com", "r3.example.com"]);

        let journal = journal.lock().unwrap();
        assert!(journal.contains(&"> vlan 10".to_string()));
        assert!(journal.contains(&"> vlan 30".to_string()));
    }

    /// Holds every sequence long enough for the queue to fill up
    struct SlowSessions;

    impl SequenceRunner for SlowSessions {
        fn run(&self, sequence: Sequence) -> SequenceReport {
            std::thread::sleep(std::time::Duration::from_millis(50));
            SequenceReport {
                host: sequence.name().to_string(),
                commands: 0,
                error: None,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_keeps_queue_bounded() {
        let hosts: Vec<String> = (0..20).map(|i| format!("r{i}")).collect();
        let mut runner = Runner::new(&config());
        runner.add_hosts(&hosts, &mut NoPrompt).unwrap();
        runner.load("show version").unwrap();

        let mut queue = WorkQueue::new(2, SlowSessions);

        let summary = runner.run(&mut queue, &RunOptions::default()).await.unwrap();
        assert_eq!(summary.submitted, 20);
        assert!(queue.queue_length() <= 2 * queue.max_concurrency());

        let reports = queue.join().await;
        assert_eq!(reports.len(), 20);
        assert_eq!(queue.queue_length(), 0);
    }
}
