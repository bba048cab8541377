//! Worker pool for asynchronous log submission

use super::diagnostics::{panic_message, Diagnostics};
use super::error::{LoggerError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default grace period for draining async work
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of worker threads fed by an unbounded queue.
///
/// Submissions carry no ordering guarantee: with more than one worker,
/// two jobs may run in either order.
///
/// # Example
///
/// ```
/// use sinklog::AsyncExecutor;
/// use std::time::Duration;
///
/// let executor = AsyncExecutor::new(2);
/// executor.submit(|| println!("ran on a worker")).unwrap();
/// assert!(executor.shutdown(Duration::from_secs(1)));
/// assert!(executor.submit(|| ()).is_err());
/// ```
pub struct AsyncExecutor {
    sender: RwLock<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    cancelled: Arc<AtomicBool>,
    size: usize,
}

impl AsyncExecutor {
    /// Spawn `threads` workers (at least one)
    pub fn new(threads: usize) -> Self {
        Self::with_diagnostics(threads, Diagnostics::new())
    }

    /// One worker per available CPU
    pub fn with_default_size() -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    pub fn with_diagnostics(threads: usize, diagnostics: Diagnostics) -> Self {
        let size = threads.max(1);
        let (sender, receiver) = unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let workers = (0..size)
            .filter_map(|idx| {
                let receiver = receiver.clone();
                let cancelled = Arc::clone(&cancelled);
                let worker_diagnostics = diagnostics.clone();
                let spawned = thread::Builder::new()
                    .name(format!("sinklog-async-{}", idx))
                    .spawn(move || Self::run_worker(receiver, cancelled, worker_diagnostics));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        diagnostics.error(&format!("Failed to spawn async worker #{}: {}", idx, e));
                        None
                    }
                }
            })
            .collect();

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            cancelled,
            size,
        }
    }

    /// An executor that has no workers and rejects every submission
    pub(crate) fn closed() -> Self {
        Self {
            sender: RwLock::new(None),
            workers: Mutex::new(Vec::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            size: 0,
        }
    }

    fn run_worker(receiver: Receiver<Job>, cancelled: Arc<AtomicBool>, diagnostics: Diagnostics) {
        while let Ok(job) = receiver.recv() {
            if cancelled.load(Ordering::Acquire) {
                // Forced termination: drain without running
                continue;
            }
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                diagnostics.critical(&format!(
                    "Async job panicked: {}. Worker continues.",
                    panic_message(payload.as_ref())
                ));
            }
        }
    }

    /// Queue a job; fails once the executor has been shut down
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(LoggerError::ExecutorShutdown)?;
        sender
            .send(Box::new(job))
            .map_err(|_| LoggerError::ExecutorShutdown)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.sender.read().as_ref().map_or(0, |s| s.len())
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Stop accepting work and wait up to `grace` for queued jobs to finish.
    ///
    /// On timeout every job still queued is cancelled and `false` is
    /// returned; a job already running is allowed to complete on its
    /// detached thread. Calling this again is a no-op returning `true`.
    pub fn shutdown(&self, grace: Duration) -> bool {
        // Closing the channel lets workers exit once the queue is empty
        drop(self.sender.write().take());

        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return true;
        }

        let start = Instant::now();
        loop {
            if workers.iter().all(|handle| handle.is_finished()) {
                for handle in workers {
                    let _ = handle.join();
                }
                return true;
            }

            if start.elapsed() >= grace {
                self.cancelled.store(true, Ordering::Release);
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Default for AsyncExecutor {
    fn default() -> Self {
        Self::with_default_size()
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        // Detach workers: they exit once the closed queue drains
        drop(self.sender.get_mut().take());
    }
}

impl fmt::Debug for AsyncExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("size", &self.size)
            .field("pending", &self.pending())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
