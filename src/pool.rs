//! Fixed-size worker pool that fingerprints chunks in parallel.
//!
//! Tasks flow through two bounded `crossbeam-channel` queues, each sized at
//! twice the worker count, so a fast producer blocks on [`WorkerPool::submit`]
//! instead of buffering the whole document:
//!
//! ```text
//!  submit() ──▶ [tasks: 2N] ──▶ worker 0..N ──▶ [results: 2N] ──▶ ResultStream
//!                                   │
//!                             SimHashGenerator
//!                           (one per worker, built
//!                            from FeatureConfig)
//! ```
//!
//! Shutdown is driven by closing the task queue: workers drain whatever is
//! still queued and exit. [`WorkerPool::stop`] waits for that with a bounded
//! timeout, then closes the result stream regardless. A worker still running
//! after the timeout is detached; anything it sends later is either picked up
//! by a consumer that is still draining or dropped.
//!
//! Each worker holds a clone of a "done" sender and never sends on it. When
//! every clone has been dropped the receiver disconnects, which is how
//! `stop` counts completed workers without a lock.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::features::FeatureConfig;
use crate::simhash::SimHashGenerator;

/// How long [`WorkerPool::stop`] waits for workers before giving up.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// One chunk to fingerprint.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: usize,
    pub data: Vec<u8>,
    pub offset: u64,
    pub source_file: String,
}

/// Fingerprint of one [`Task`], correlated by `task_id`.
#[derive(Debug, Clone)]
pub struct SimHashResult {
    pub task_id: usize,
    pub fingerprint: u64,
    pub data: Vec<u8>,
    pub offset: u64,
    pub source_file: String,
}

/// What [`WorkerPool::stop`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    /// Every worker exited before the timeout.
    pub completed: bool,
    /// Workers still running when the timeout expired.
    pub outstanding: usize,
}

pub struct WorkerPool {
    num_workers: usize,
    features: FeatureConfig,
    stop_timeout: Duration,
    task_tx: Option<Sender<Task>>,
    task_rx: Option<Receiver<Task>>,
    result_tx: Option<Sender<SimHashResult>>,
    result_rx: Receiver<SimHashResult>,
    closed_tx: Option<Sender<()>>,
    closed_rx: Receiver<()>,
    done_rx: Option<Receiver<()>>,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl WorkerPool {
    /// Create a pool of `num_workers` (≥ 1). Workers are not spawned until
    /// [`start`](Self::start).
    pub fn new(num_workers: usize, features: FeatureConfig) -> Result<Self> {
        if num_workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        let capacity = num_workers * 2;
        let (task_tx, task_rx) = bounded(capacity);
        let (result_tx, result_rx) = bounded(capacity);
        let (closed_tx, closed_rx) = bounded(0);

        Ok(Self {
            num_workers,
            features,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            task_tx: Some(task_tx),
            task_rx: Some(task_rx),
            result_tx: Some(result_tx),
            result_rx,
            closed_tx: Some(closed_tx),
            closed_rx,
            done_rx: None,
            handles: Vec::with_capacity(num_workers),
            started: false,
        })
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Capacity of each of the two queues.
    pub fn queue_capacity(&self) -> usize {
        self.num_workers * 2
    }

    /// Spawn the workers. A pool can be started once.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::Pool("pool already started".to_string()));
        }
        let (task_rx, result_tx) = match (self.task_rx.take(), self.result_tx.as_ref()) {
            (Some(rx), Some(tx)) => (rx, tx.clone()),
            _ => return Err(Error::Pool("pool already stopped".to_string())),
        };
        self.started = true;

        let (done_tx, done_rx) = bounded::<()>(0);
        for worker_id in 0..self.num_workers {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            let done = done_tx.clone();
            let features = self.features.clone();
            let handle = thread::Builder::new()
                .name(format!("simhash-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, features, tasks, results, done))
                .map_err(|e| Error::Pool(format!("failed to spawn worker {}: {}", worker_id, e)))?;
            self.handles.push(handle);
        }
        self.done_rx = Some(done_rx);

        debug!(
            workers = self.num_workers,
            capacity = self.queue_capacity(),
            features = self.features.name(),
            "worker pool started"
        );
        Ok(())
    }

    /// Enqueue a task, blocking while the task queue is full.
    pub fn submit(&self, task: Task) -> Result<()> {
        if !self.started {
            return Err(Error::Pool("submit before start".to_string()));
        }
        let tx = self
            .task_tx
            .as_ref()
            .ok_or_else(|| Error::Pool("submit after stop".to_string()))?;
        tx.send(task)
            .map_err(|_| Error::Pool("no workers left to accept tasks".to_string()))
    }

    /// Handle on the result queue. Drain it before or while calling `stop`.
    pub fn results(&self) -> ResultStream {
        ResultStream {
            results: self.result_rx.clone(),
            closed: self.closed_rx.clone(),
        }
    }

    /// Close the task queue, wait (bounded) for workers, close the results.
    ///
    /// Calling `stop` again is a no-op.
    pub fn stop(&mut self) -> StopOutcome {
        drop(self.task_tx.take());

        let outstanding = match self.done_rx.take() {
            Some(done) => self.wait_for_workers(&done),
            None => 0,
        };

        drop(self.result_tx.take());
        drop(self.closed_tx.take());

        if outstanding == 0 {
            for handle in self.handles.drain(..) {
                let name = handle.thread().name().unwrap_or("worker").to_string();
                if handle.join().is_err() {
                    warn!(worker = %name, "worker panicked; its task produced no result");
                }
            }
        } else {
            // Detach stragglers; they exit once their current send resolves.
            self.handles.clear();
        }

        StopOutcome {
            completed: outstanding == 0,
            outstanding,
        }
    }

    fn wait_for_workers(&self, done: &Receiver<()>) -> usize {
        let deadline = Instant::now() + self.stop_timeout;
        loop {
            match done.recv_deadline(deadline) {
                Err(RecvTimeoutError::Disconnected) => return 0,
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    let outstanding = self.handles.iter().filter(|h| !h.is_finished()).count();
                    if outstanding > 0 {
                        warn!(
                            outstanding,
                            timeout = ?self.stop_timeout,
                            "workers did not finish before the stop timeout; closing results anyway"
                        );
                    }
                    return outstanding;
                }
            }
        }
    }
}

fn worker_loop(
    worker_id: usize,
    features: FeatureConfig,
    tasks: Receiver<Task>,
    results: Sender<SimHashResult>,
    _done: Sender<()>,
) {
    let generator = SimHashGenerator::new(features.build());
    let mut processed = 0usize;

    for task in tasks.iter() {
        let fingerprint = generator.hash_bytes(&task.data);
        let result = SimHashResult {
            task_id: task.id,
            fingerprint,
            data: task.data,
            offset: task.offset,
            source_file: task.source_file,
        };
        if results.send(result).is_err() {
            debug!(worker_id, "result queue disconnected");
            break;
        }
        processed += 1;
    }

    debug!(worker_id, processed, "worker exiting");
}

/// Consumer side of the result queue.
///
/// Yields results until the pool has been stopped and everything buffered
/// has been delivered. Clones share the same queue.
#[derive(Clone)]
pub struct ResultStream {
    results: Receiver<SimHashResult>,
    closed: Receiver<()>,
}

impl ResultStream {
    /// Block for the next result; `None` once the pool is stopped and drained.
    pub fn recv(&self) -> Option<SimHashResult> {
        if let Ok(result) = self.results.try_recv() {
            return Some(result);
        }
        select! {
            recv(self.results) -> msg => msg.ok(),
            recv(self.closed) -> _ => self.results.try_recv().ok(),
        }
    }

    /// Wait at most `timeout` for the next result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SimHashResult> {
        if let Ok(result) = self.results.try_recv() {
            return Some(result);
        }
        select! {
            recv(self.results) -> msg => msg.ok(),
            recv(self.closed) -> _ => self.results.try_recv().ok(),
            default(timeout) => None,
        }
    }
}

impl Iterator for ResultStream {
    type Item = SimHashResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn task(id: usize, text: &str) -> Task {
        Task {
            id,
            data: text.as_bytes().to_vec(),
            offset: (id * 100) as u64,
            source_file: "test.txt".to_string(),
        }
    }

    #[test]
    fn new_pool_sizes_queues_from_worker_count() {
        let pool = WorkerPool::new(4, FeatureConfig::default()).unwrap();
        assert_eq!(pool.num_workers(), 4);
        assert_eq!(pool.queue_capacity(), 8);
    }

    #[test]
    fn zero_workers_is_config_error() {
        assert!(matches!(
            WorkerPool::new(0, FeatureConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn single_task_round_trip() {
        let mut pool = WorkerPool::new(2, FeatureConfig::default()).unwrap();
        pool.start().unwrap();
        let results = pool.results();

        let t = task(1, "This is a test string for simhash calculation");
        pool.submit(t.clone()).unwrap();

        let result = results
            .recv_timeout(Duration::from_secs(2))
            .expect("timed out waiting for result");
        assert_eq!(result.task_id, t.id);
        assert_eq!(result.data, t.data);
        assert_eq!(result.offset, t.offset);
        assert_eq!(result.source_file, t.source_file);
        assert_ne!(result.fingerprint, 0);

        let outcome = pool.stop();
        assert!(outcome.completed);
        assert!(results.recv().is_none());
    }

    #[test]
    fn fingerprint_matches_direct_hash() {
        let mut pool = WorkerPool::new(1, FeatureConfig::ngram(3, 1)).unwrap();
        pool.start().unwrap();
        let results = pool.results();
        pool.submit(task(0, "hello fingerprint")).unwrap();
        let result = results.recv_timeout(Duration::from_secs(2)).unwrap();
        pool.stop();

        let direct = SimHashGenerator::new(FeatureConfig::ngram(3, 1).build());
        assert_eq!(result.fingerprint, direct.hash("hello fingerprint"));
    }

    #[test]
    fn every_task_yields_exactly_one_result() {
        for workers in [1, 2, 4, 8] {
            let k = 200;
            let mut pool = WorkerPool::new(workers, FeatureConfig::default()).unwrap();
            pool.start().unwrap();
            let results = pool.results();

            let ids = thread::scope(|s| {
                let consumer = s.spawn(move || results.map(|r| r.task_id).collect::<Vec<_>>());
                for id in 0..k {
                    pool.submit(task(id, &format!("chunk number {}", id))).unwrap();
                }
                assert!(pool.stop().completed);
                consumer.join().unwrap()
            });

            assert_eq!(ids.len(), k, "workers={}", workers);
            let unique: HashSet<usize> = ids.into_iter().collect();
            assert_eq!(unique.len(), k);
            assert!((0..k).all(|id| unique.contains(&id)));
        }
    }

    #[test]
    fn submit_before_start_fails() {
        let pool = WorkerPool::new(1, FeatureConfig::default()).unwrap();
        assert!(matches!(pool.submit(task(0, "x")), Err(Error::Pool(_))));
    }

    #[test]
    fn submit_after_stop_fails() {
        let mut pool = WorkerPool::new(1, FeatureConfig::default()).unwrap();
        pool.start().unwrap();
        pool.stop();
        assert!(matches!(pool.submit(task(0, "x")), Err(Error::Pool(_))));
    }

    #[test]
    fn double_start_fails() {
        let mut pool = WorkerPool::new(1, FeatureConfig::default()).unwrap();
        pool.start().unwrap();
        assert!(matches!(pool.start(), Err(Error::Pool(_))));
        pool.stop();
    }

    #[test]
    fn stop_is_idempotent_and_safe_without_start() {
        let mut pool = WorkerPool::new(2, FeatureConfig::default()).unwrap();
        assert!(pool.stop().completed);
        assert!(pool.stop().completed);
    }

    #[test]
    fn stop_returns_within_timeout_when_a_worker_is_stuck() {
        // One worker, queues of two. Nobody drains results, so the worker
        // blocks sending its third result.
        let mut pool = WorkerPool::new(1, FeatureConfig::default())
            .unwrap()
            .with_stop_timeout(Duration::from_millis(200));
        pool.start().unwrap();
        let results = pool.results();
        for id in 0..5 {
            pool.submit(task(id, "stuck worker text")).unwrap();
        }

        let started = Instant::now();
        let outcome = pool.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!outcome.completed);
        assert_eq!(outcome.outstanding, 1);

        // Buffered results are still delivered, then the stream ends.
        let drained: Vec<_> = results.collect();
        assert!(drained.len() >= 2 && drained.len() <= 5, "got {}", drained.len());
    }
}
