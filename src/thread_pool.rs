use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::signal::Signal;
use crate::Result;

pub const DEFAULT_THREAD_COUNT: usize = 4;

pub type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Failure of a queued job, reported through
/// [`ThreadPool::error_occurred`]
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job failed: {0:#}")]
    Failed(anyhow::Error),
    #[error("Job panicked: {0}")]
    Panicked(String),
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    stop: bool,
    finish: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    condition: Condvar,
    error_occurred: Signal<JobError>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a job is available. `None` tells the worker to quit.
    fn next_job(&self) -> Option<Job> {
        let mut queue = self.lock();
        loop {
            if queue.stop {
                return None;
            }
            if let Some(job) = queue.jobs.pop_front() {
                return Some(job);
            }
            if queue.finish {
                return None;
            }
            queue = self
                .condition
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn execute(&self, job: Job) {
        let error = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => JobError::Failed(e),
            Err(payload) => JobError::Panicked(panic_message(payload.as_ref())),
        };

        log::error!("{}", error);
        self.error_occurred.emit(&error);
    }

    fn run(&self) {
        log::trace!("Worker started");
        while let Some(job) = self.next_job() {
            self.execute(job);
        }
        log::trace!("Worker finished");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Fixed number of threads executing queued jobs in FIFO order.
///
/// Jobs may be queued before the pool is started. Errors returned or
/// panics raised by a job never reach the code that queued it; they are
/// logged and emitted on [`ThreadPool::error_occurred`].
pub struct ThreadPool {
    thread_count: usize,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(DEFAULT_THREAD_COUNT)
    }
}

impl ThreadPool {
    pub fn new(thread_count: usize) -> Self {
        Self {
            thread_count,
            shared: Arc::new(Shared::default()),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Spawn the worker threads, does nothing when they are running
    pub fn start(&self) -> Result<()> {
        let mut threads = self.lock_threads();
        if !threads.is_empty() {
            return Ok(());
        }

        {
            let mut queue = self.shared.lock();
            queue.stop = false;
            queue.finish = false;
        }

        for index in 0..self.thread_count {
            let shared = self.shared.clone();
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{}", index))
                .spawn(move || shared.run())?;
            threads.push(handle);
        }

        log::debug!("Started thread pool with {} threads", self.thread_count);
        Ok(())
    }

    /// Drop the queued jobs, wait for the running ones and join the threads
    pub fn stop(&self) {
        {
            let mut queue = self.shared.lock();
            queue.jobs.clear();
            queue.stop = true;
        }
        self.shared.condition.notify_all();
        self.join();
    }

    /// Run every queued job, then join the threads
    pub fn stop_finish_jobs(&self) {
        self.shared.lock().finish = true;
        self.shared.condition.notify_all();
        self.join();
    }

    pub fn add_job<F>(&self, job: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.shared.lock().jobs.push_back(Box::new(job));
        self.shared.condition.notify_one();
    }

    pub fn queued_jobs(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    pub fn error_occurred(&self) -> &Signal<JobError> {
        &self.shared.error_occurred
    }

    fn join(&self) {
        let threads = std::mem::take(&mut *self.lock_threads());
        if threads.is_empty() {
            return;
        }

        for handle in threads {
            if handle.join().is_err() {
                log::warn!("Worker thread terminated abnormally");
            }
        }
        log::debug!("Stopped thread pool");
    }

    fn lock_threads(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}
