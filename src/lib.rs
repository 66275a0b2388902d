use std::sync::Once;

pub mod errors;
pub use errors::{Result, UtilsError};

pub mod fileops;
pub mod logging;
pub mod reader;
pub mod signal;
pub mod stringops;
pub mod thread_pool;
pub mod timeops;
pub mod timer;
pub mod trace;
pub mod worker_thread;

pub use logging::LogConfig;
pub use reader::{
    BufferedReader, FileReader, Reader, ReaderBuilder, ReaderFactory,
};
pub use signal::{Signal, SlotId};
pub use thread_pool::{JobError, ThreadPool};
pub use timer::Timer;
pub use trace::{PerfLogger, ScopedPerfTrace};
pub use worker_thread::WorkerThread;

static INIT: Once = Once::new();

/// Install the default logger, once per process. Does nothing when the
/// application already installed a logger of its own.
pub fn initialize() {
    INIT.call_once(|| {
        if let Err(e) = logging::init(&LogConfig::default()) {
            log::debug!("Keeping the installed logger: {}", e);
            return;
        }
        log::info!("Initializing utilkit");
    });
}
