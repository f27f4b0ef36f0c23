//! Starters
//!
//! A [`Starter`] runs a unit of work on some thread other than the caller's.
//! Off-marshaling uses one to move evaluation away from the event loop.

use std::fmt;
use std::thread;

use tokio::runtime::{self, Handle, Runtime};
use tracing::trace;

use crate::error::Result;

/// Unit of work handed to a starter
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Default name for worker threads
pub const WORKER_THREAD_NAME: &str = "spin-worker";

/// Runs work asynchronously on another thread
pub trait Starter: Send + Sync + fmt::Debug {
    /// Schedule `work`; returns once it is scheduled, not once it has run
    fn start(&self, work: Work) -> Result<()>;
}

/// Starts a new thread for every unit of work
#[derive(Debug, Clone)]
pub struct ThreadStarter {
    name: String,
}

impl ThreadStarter {
    pub fn new() -> Self {
        Self::named(WORKER_THREAD_NAME)
    }

    /// Name the spawned threads
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadStarter {
    fn default() -> Self {
        Self::new()
    }
}

impl Starter for ThreadStarter {
    fn start(&self, work: Work) -> Result<()> {
        thread::Builder::new().name(self.name.clone()).spawn(work)?;
        trace!("started work on a new '{}' thread", self.name);
        Ok(())
    }
}

/// Runs work on the blocking pool of a tokio runtime
///
/// Work is expected to block (it is a synchronous target call), so it goes
/// through `spawn_blocking` rather than onto the async workers.
pub struct RuntimeStarter {
    handle: Handle,
    /// Present when the starter owns its runtime
    runtime: Option<Runtime>,
}

impl RuntimeStarter {
    /// Build a dedicated runtime with up to `workers` blocking threads
    pub fn new(workers: usize) -> Result<Self> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers.max(1))
            .thread_name(WORKER_THREAD_NAME)
            .build()?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Share an existing runtime
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Starter for RuntimeStarter {
    fn start(&self, work: Work) -> Result<()> {
        drop(self.handle.spawn_blocking(work));
        Ok(())
    }
}

impl fmt::Debug for RuntimeStarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeStarter")
            .field("owned", &self.runtime.is_some())
            .finish()
    }
}

impl Drop for RuntimeStarter {
    fn drop(&mut self) {
        // The last reference may be released on one of the runtime's own
        // blocking threads, where a blocking shutdown would panic
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
