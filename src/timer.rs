use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Result;

#[derive(Default)]
struct Cancellation {
    cancelled: Mutex<bool>,
    condition: Condvar,
}

impl Cancellation {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        *self.lock() = true;
        self.condition.notify_all();
    }

    /// Returns true when the timeout elapsed without a cancellation
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .condition
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }
}

struct Running {
    cancellation: Arc<Cancellation>,
    handle: JoinHandle<()>,
}

/// One-shot timer invoking a callback on its own thread.
///
/// Starting a new run cancels the pending one. Dropping the timer cancels
/// it as well.
#[derive(Default)]
pub struct Timer {
    running: Mutex<Option<Running>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<F>(&self, timeout: Duration, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let cancellation = Arc::new(Cancellation::default());
        let waiter = cancellation.clone();
        let handle = thread::Builder::new()
            .name("timer".to_owned())
            .spawn(move || {
                if waiter.wait(timeout) {
                    callback();
                } else {
                    log::trace!("Timer cancelled");
                }
            })?;

        *self.lock() = Some(Running {
            cancellation,
            handle,
        });
        Ok(())
    }

    /// Invoke `callback` every `interval` until the timer is cancelled,
    /// dropped or started again.
    pub fn run_repeating<F>(
        &self,
        interval: Duration,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.cancel();

        let cancellation = Arc::new(Cancellation::default());
        let waiter = cancellation.clone();
        let handle = thread::Builder::new()
            .name("timer".to_owned())
            .spawn(move || {
                while waiter.wait(interval) {
                    callback();
                }
                log::trace!("Repeating timer cancelled");
            })?;

        *self.lock() = Some(Running {
            cancellation,
            handle,
        });
        Ok(())
    }

    /// Prevent the callback from firing if it did not yet. Waits for a
    /// callback that is already executing.
    pub fn cancel(&self) {
        let Some(running) = self.lock().take() else {
            return;
        };

        running.cancellation.cancel();
        // cancelling from inside the callback must not join itself
        if running.handle.thread().id() != thread::current().id()
            && running.handle.join().is_err()
        {
            log::warn!("Timer callback panicked");
        }
    }

    /// True until the callback has run or the timer was cancelled. A
    /// repeating timer runs until cancelled.
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .map_or(false, |running| !running.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
