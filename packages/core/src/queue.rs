//! Bounded work queue
//!
//! Runs compiled sequences with at most `max_threads` in parallel. Every
//! submission holds one of `2 × max_threads` slots until its sequence has
//! finished, so `enqueue` waits whenever that many sequences are queued or
//! running. This caps how many parsed scripts are alive at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::runner::RunContext;
use crate::session::{Sequence, SequenceReport, SequenceRunner};

/// Errors raised by the work queue
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Work queue is closed")]
    Closed,
}

type CompletionHook = Arc<dyn Fn(&SequenceReport) + Send + Sync>;

/// A reserved place in the queue
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Executor for compiled sequences
pub struct WorkQueue<R> {
    name: String,
    max_threads: usize,
    runner: Arc<R>,
    slots: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    tasks: JoinSet<SequenceReport>,
    on_complete: Option<CompletionHook>,
}

impl<R: SequenceRunner> WorkQueue<R> {
    /// Create a queue running up to `max_threads` sequences at once
    pub fn new(max_threads: usize, runner: R) -> Self {
        let max_threads = max_threads.max(1);
        Self {
            name: "termrun".to_string(),
            max_threads,
            runner: Arc::new(runner),
            slots: Arc::new(Semaphore::new(max_threads * 2)),
            workers: Arc::new(Semaphore::new(max_threads)),
            pending: Arc::new(AtomicUsize::new(0)),
            tasks: JoinSet::new(),
            on_complete: None,
        }
    }

    /// Builder pattern: set the name scripts see as `__runner__`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder pattern: call `hook` after every finished sequence
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SequenceReport) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Wait for a free slot
    ///
    /// The slot is released when the sequence submitted with it finishes,
    /// or when it is dropped unused.
    pub async fn reserve(&self) -> Result<Slot, QueueError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(Slot { _permit: permit })
    }

    /// Submit a sequence into a reserved slot
    pub fn submit(&mut self, slot: Slot, sequence: Sequence) {
        self.pending.fetch_add(1, Ordering::SeqCst);

        let runner = Arc::clone(&self.runner);
        let workers = Arc::clone(&self.workers);
        let pending = Arc::clone(&self.pending);
        let on_complete = self.on_complete.clone();
        let host = sequence.name().to_string();

        self.tasks.spawn(async move {
            let report = match workers.acquire_owned().await {
                Ok(_worker) => tokio::task::spawn_blocking(move || runner.run(sequence))
                    .await
                    .unwrap_or_else(|e| SequenceReport {
                        host,
                        commands: 0,
                        error: Some(format!("worker panicked: {e}")),
                    }),
                Err(_) => SequenceReport {
                    host,
                    commands: 0,
                    error: Some(QueueError::Closed.to_string()),
                },
            };
            if let Some(hook) = on_complete {
                hook(&report);
            }
            pending.fetch_sub(1, Ordering::SeqCst);
            drop(slot);
            report
        });
    }

    /// Submit a sequence, waiting while the queue is full
    pub async fn enqueue(&mut self, sequence: Sequence) -> Result<(), QueueError> {
        let slot = self.reserve().await?;
        self.submit(slot, sequence);
        Ok(())
    }

    /// Sequences queued or running
    pub fn queue_length(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_threads
    }

    /// Wait for every submitted sequence; reports arrive in completion order
    pub async fn join(&mut self) -> Vec<SequenceReport> {
        let mut reports = Vec::new();
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!("Sequence task failed: {}", e),
            }
        }
        reports
    }
}

impl<R: SequenceRunner> RunContext for WorkQueue<R> {
    fn max_threads(&self) -> usize {
        self.max_threads
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ConnectSpec, Protocol};
    use crate::template::LineScript;
    use crate::vars::Variables;
    use std::time::Duration;

    /// Tracks how many sequences run at the same time
    #[derive(Default)]
    struct SlowRunner {
        running: AtomicUsize,
        peak: Arc<AtomicUsize>,
    }

    impl SequenceRunner for SlowRunner {
        fn run(&self, sequence: Sequence) -> SequenceReport {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);
            SequenceReport {
                host: sequence.name().to_string(),
                commands: 0,
                error: None,
            }
        }
    }

    fn sequence(host: &str) -> Sequence {
        Sequence::new(
            host,
            ConnectSpec {
                protocol: Protocol::Telnet,
                host: host.to_string(),
                port: None,
                echo: false,
                auto_verify: false,
            },
            None,
            Box::new(LineScript::parse("exit", &Variables::new()).unwrap()),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queue_length_is_bounded() {
        let peak = Arc::new(AtomicUsize::new(0));
        let runner = SlowRunner {
            peak: peak.clone(),
            ..Default::default()
        };
        let mut queue = WorkQueue::new(2, runner);

        for i in 0..12 {
            queue.enqueue(sequence(&format!("r{i}"))).await.unwrap();
            assert!(queue.queue_length() <= 2 * queue.max_concurrency());
        }
        let reports = queue.join().await;

        assert_eq!(reports.len(), 12);
        assert!(reports.iter().all(SequenceReport::is_success));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(queue.queue_length(), 0);
    }

    #[tokio::test]
    async fn test_completion_hook_sees_every_report() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut queue = WorkQueue::new(1, SlowRunner::default()).on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for host in ["a", "b", "c"] {
            queue.enqueue(sequence(host)).await.unwrap();
        }
        queue.join().await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_threads_means_one() {
        let queue = WorkQueue::new(0, SlowRunner::default()).with_name("nightly");
        assert_eq!(queue.max_concurrency(), 1);
        assert_eq!(RunContext::name(&queue), "nightly");
    }

    #[tokio::test]
    async fn test_unused_slot_is_released() {
        let queue = WorkQueue::new(1, SlowRunner::default());
        for _ in 0..5 {
            let slot = queue.reserve().await.unwrap();
            drop(slot);
        }
        assert_eq!(queue.queue_length(), 0);
    }
}
