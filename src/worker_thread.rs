use crate::signal::Signal;
use crate::thread_pool::{JobError, ThreadPool};
use crate::Result;

/// Queue of jobs executed one after another on a single background thread.
pub struct WorkerThread {
    pool: ThreadPool,
}

impl Default for WorkerThread {
    fn default() -> Self {
        Self {
            pool: ThreadPool::new(1),
        }
    }
}

impl WorkerThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Result<()> {
        self.pool.start()
    }

    /// Drop the queued jobs and join the thread once the running job is done
    pub fn stop(&self) {
        self.pool.stop();
    }

    pub fn add_job<F>(&self, job: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.pool.add_job(job);
    }

    pub fn error_occurred(&self) -> &Signal<JobError> {
        self.pool.error_occurred()
    }
}
