//! Small typed worker pool.
//!
//! Work is pushed onto an unbounded queue so the submitting thread never blocks. Every worker runs
//! the same callback and posts its result to one shared completion channel that the owner drains
//! at its own pace (typically once per frame/update).

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Worker pool needs at least one worker")]
    NoWorkers,
    #[error("Work queue is closed")]
    Disconnected,
}

pub type WorkResult<T> = std::result::Result<T, WorkError>;

type Callback<T, R> = Arc<dyn Fn(T) -> R + Send + Sync + 'static>;

pub struct WorkSystem<T, R> {
    sender: Option<Sender<T>>,
    results: Receiver<R>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl<T: Send + 'static, R: Send + 'static> WorkSystem<T, R> {
    /// Creates a new WorkSystem with the specified number of worker threads. Threads are named
    /// `{name}-{index}`.
    pub fn new<F>(name: &str, num_workers: usize, callback: F) -> WorkResult<Self>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        if num_workers == 0 {
            return Err(WorkError::NoWorkers);
        }

        let (sender, receiver) = unbounded::<T>();
        let (result_sender, results) = unbounded::<R>();
        let callback: Callback<T, R> = Arc::new(callback);
        let mut handles = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let worker_receiver = receiver.clone();
            let worker_results = result_sender.clone();
            let worker_callback = Arc::clone(&callback);

            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || {
                    while let Ok(data) = worker_receiver.recv() {
                        let result = worker_callback(data);
                        // Owner is gone, nobody to report to
                        if worker_results.send(result).is_err() {
                            break;
                        }
                    }
                })?;

            handles.push(handle);
        }

        debug!("Started worker pool '{}' with {} workers", name, num_workers);

        Ok(Self {
            sender: Some(sender),
            results,
            handles,
        })
    }

    /// Queues work for the pool. Never blocks.
    pub fn add_work(&self, data: T) -> WorkResult<()> {
        self.sender
            .as_ref()
            .ok_or(WorkError::Disconnected)?
            .send(data)
            .map_err(|_| WorkError::Disconnected)
    }

    /// Returns a finished result if one is available without blocking.
    pub fn try_recv(&self) -> Option<R> {
        self.results.try_recv().ok()
    }

    /// Waits up to `timeout` for the next finished result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<R> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of queued items not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

impl<T, R> Drop for WorkSystem<T, R> {
    fn drop(&mut self) {
        // Closing the queue makes every worker fall out of its recv loop
        self.sender.take();

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
