//! Cooperative event loop
//!
//! One thread drives the loop and runs every queued event in FIFO order.
//! Code already running on that thread may pump the queue reentrantly with
//! [`EventLoop::pump_until`]: the caller waits for a [`PumpSignal`] while
//! the events queued behind it keep being processed. Pumps nest; an inner
//! pump must return before the outer one can observe its own signal.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::error::{LoopError, Result};
use crate::window::WindowTable;

/// A unit of work queued on the loop
pub type Event = Box<dyn FnOnce() + Send + 'static>;

/// State shared by every handle of one loop
struct Shared {
    /// Loop name, also used as the thread name when spawned
    name: String,
    /// Pending events
    queue: Mutex<VecDeque<Event>>,
    /// Signalled when an event is queued or a pump signal is raised
    ready: Condvar,
    /// The thread driving this loop
    owner: OnceLock<ThreadId>,
    /// Number of pumps currently active on the loop thread
    depth: AtomicUsize,
    /// Number of events run so far
    processed: AtomicU64,
    /// Set once the loop refuses new events
    closed: AtomicBool,
    /// Raised by shutdown, stops the outermost pump
    shutdown: Arc<AtomicBool>,
    /// Headless window state
    windows: Mutex<WindowTable>,
}

/// Handle to a cooperative event loop
///
/// Handles are cheap to clone and may be used from any thread. Only the
/// thread driving the loop (see [`EventLoop::run`]) may pump it.
#[derive(Clone)]
pub struct EventLoop {
    shared: Arc<Shared>,
}

/// Stop condition for one pump
///
/// Raising the signal wakes the loop thread; the pump waiting on it returns
/// as soon as the event currently running (if any) completes. Raising is
/// idempotent and may happen before the pump starts, in which case the pump
/// returns immediately.
#[derive(Clone)]
pub struct PumpSignal {
    raised: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl PumpSignal {
    /// Raise the signal from any thread
    pub fn raise(&self) {
        let _queue = self.shared.queue.lock();
        self.raised.store(true, Ordering::SeqCst);
        self.shared.ready.notify_all();
    }

    /// Check whether the signal has been raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for PumpSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PumpSignal")
            .field("loop", &self.shared.name)
            .field("raised", &self.is_raised())
            .finish()
    }
}

impl EventLoop {
    /// Create a loop that is not yet driven by any thread
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                queue: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
                owner: OnceLock::new(),
                depth: AtomicUsize::new(0),
                processed: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                shutdown: Arc::new(AtomicBool::new(false)),
                windows: Mutex::new(WindowTable::default()),
            }),
        }
    }

    /// Create a loop driven by a new dedicated thread
    pub fn spawn(name: impl Into<String>) -> Result<(Self, JoinHandle<()>)> {
        let event_loop = Self::new(name);
        let driver = event_loop.clone();
        let join = thread::Builder::new()
            .name(event_loop.name().to_string())
            .spawn(move || {
                if let Err(e) = driver.run() {
                    error!("event loop '{}' failed: {}", driver.name(), e);
                }
            })?;

        // The driver binds itself too; both sides record the same id.
        let _ = event_loop.shared.owner.set(join.thread().id());
        Ok((event_loop, join))
    }

    /// The process-wide loop used by the default spinners
    ///
    /// Started lazily on a thread named [`crate::MAIN_LOOP_NAME`].
    pub fn main() -> &'static EventLoop {
        static MAIN: OnceLock<EventLoop> = OnceLock::new();
        MAIN.get_or_init(|| match Self::spawn(crate::MAIN_LOOP_NAME) {
            Ok((event_loop, _join)) => event_loop,
            Err(e) => panic!("unable to start the main event loop: {}", e),
        })
    }

    /// Get the loop name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Drive the loop on the current thread until [`EventLoop::shutdown`]
    ///
    /// Fails if another thread already drives this loop.
    pub fn run(&self) -> Result<()> {
        let current = thread::current().id();
        let owner = *self.shared.owner.get_or_init(|| current);
        if owner != current {
            return Err(LoopError::AlreadyBound(self.shared.name.clone()));
        }

        debug!("event loop '{}' running", self.shared.name);
        let shutdown = PumpSignal {
            raised: Arc::clone(&self.shared.shutdown),
            shared: Arc::clone(&self.shared),
        };
        self.pump_until(&shutdown)?;

        let dropped: Vec<Event> = self.shared.queue.lock().drain(..).collect();
        debug!(
            "event loop '{}' stopped, dropping {} pending events",
            self.shared.name,
            dropped.len()
        );
        drop(dropped);
        Ok(())
    }

    /// Create a fresh, unraised stop signal for [`EventLoop::pump_until`]
    pub fn signal(&self) -> PumpSignal {
        PumpSignal {
            raised: Arc::new(AtomicBool::new(false)),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Process queued events until `signal` is raised
    ///
    /// Must be called on the loop thread. Blocks the caller, but the loop
    /// keeps running: every event queued in the meantime is executed from
    /// inside this call, including events that start nested pumps.
    pub fn pump_until(&self, signal: &PumpSignal) -> Result<()> {
        self.ensure_loop_thread()?;

        let depth = self.shared.depth.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("pump started on '{}' at depth {}", self.shared.name, depth);

        loop {
            let event = {
                let mut queue = self.shared.queue.lock();
                loop {
                    if signal.is_raised() {
                        break None;
                    }
                    if let Some(event) = queue.pop_front() {
                        break Some(event);
                    }
                    self.shared.ready.wait(&mut queue);
                }
            };

            match event {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }

        self.shared.depth.fetch_sub(1, Ordering::SeqCst);
        trace!("pump stopped on '{}' at depth {}", self.shared.name, depth);
        Ok(())
    }

    /// Run one event, containing any panic it raises
    fn dispatch(&self, event: Event) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(event));
        self.shared.processed.fetch_add(1, Ordering::SeqCst);
        if outcome.is_err() {
            error!("event panicked on loop '{}'", self.shared.name);
        }
    }

    /// Queue `event` behind everything already pending and return at once
    pub fn invoke_later<F>(&self, event: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(LoopError::Closed(self.shared.name.clone()));
        }
        queue.push_back(Box::new(event));
        self.shared.ready.notify_all();
        Ok(())
    }

    /// Queue `event` and block the calling thread until it has run
    ///
    /// Must not be called on the loop thread itself.
    pub fn invoke_and_wait<F, R>(&self, event: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_loop_thread() {
            return Err(LoopError::WouldDeadlock(self.shared.name.clone()));
        }

        let (tx, rx) = oneshot::channel();
        self.invoke_later(move || {
            let _ = tx.send(event());
        })?;

        rx.blocking_recv()
            .map_err(|_| LoopError::Dropped(self.shared.name.clone()))
    }

    /// Check whether the calling thread drives this loop
    pub fn is_loop_thread(&self) -> bool {
        self.shared.owner.get() == Some(&thread::current().id())
    }

    /// Fail unless called on the loop thread
    pub fn ensure_loop_thread(&self) -> Result<()> {
        if self.is_loop_thread() {
            Ok(())
        } else {
            Err(LoopError::NotLoopThread(self.shared.name.clone()))
        }
    }

    /// Panic unless called on the loop thread
    ///
    /// For objects that must only ever be touched by the loop, such as
    /// callbacks meant to be marshaled onto it.
    #[track_caller]
    pub fn assert_loop_thread(&self) {
        if !self.is_loop_thread() {
            panic!("assertion failed: not on loop thread of '{}'", self.shared.name);
        }
    }

    /// Panic when called on the loop thread
    ///
    /// For objects that must never block the loop, such as services meant
    /// to be marshaled off it.
    #[track_caller]
    pub fn assert_not_loop_thread(&self) {
        if self.is_loop_thread() {
            panic!("assertion failed: on loop thread of '{}'", self.shared.name);
        }
    }

    /// Refuse new events and stop the outermost pump
    pub fn shutdown(&self) {
        let _queue = self.shared.queue.lock();
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.ready.notify_all();
    }

    /// Check whether the loop refuses new events
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of pumps currently nested on the loop thread
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    /// Number of events run so far
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::SeqCst)
    }

    /// Number of events waiting to run
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub(crate) fn windows(&self) -> MutexGuard<'_, WindowTable> {
        self.shared.windows.lock()
    }

    /// Check whether two handles refer to the same loop
    pub fn same_loop(&self, other: &EventLoop) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("name", &self.shared.name)
            .field("depth", &self.depth())
            .field("closed", &self.is_closed())
            .finish()
    }
}
