//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use eventloop::EventLoop;
use parking_lot::Mutex;
use spin::Target;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test-friendly subscriber once per test binary
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// A spawned event loop, shut down and joined on drop
pub struct TestLoop {
    pub event_loop: EventLoop,
    join: Option<JoinHandle<()>>,
}

impl TestLoop {
    pub fn spawn(name: &str) -> Self {
        let (event_loop, join) = EventLoop::spawn(name).expect("failed to spawn loop");
        Self {
            event_loop,
            join: Some(join),
        }
    }

    /// Run `f` on the loop thread and wait for its result
    pub fn run<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.event_loop
            .invoke_and_wait(f)
            .expect("loop event did not complete")
    }
}

impl Drop for TestLoop {
    fn drop(&mut self) {
        self.event_loop.shutdown();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeanError {
    Empty,
}

spin::interface! {
    /// Notified when a bean's value changes
    pub trait ChangeListener {
        fn changed(&self, value: String);
    }
}

spin::interface! {
    /// A value holder whose calls may be slow
    pub trait Bean {
        fn value(&self) -> String;
        fn set_value(&self, value: String);
        fn checked_len(&self, value: String) -> Result<usize, BeanError>;
        fn explode(&self, message: String);
        fn add_change_listener(&self, listener: #[listener] Arc<dyn ChangeListener>);
        fn remove_change_listener(&self, listener: #[listener] Arc<dyn ChangeListener>);
        fn listener_count(&self) -> usize;
    }
}

/// Bean meant to live off the loop thread
pub struct SlowBean {
    value: Mutex<String>,
    delay: Duration,
    calls: AtomicUsize,
    threads: Mutex<Vec<ThreadId>>,
    listeners: Mutex<Vec<Arc<dyn ChangeListener>>>,
}

impl SlowBean {
    pub fn new(value: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value.to_string()),
            delay,
            calls: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Threads the bean's methods ran on, in call order
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().clone()
    }

    pub fn listeners(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.listeners.lock().clone()
    }

    /// Notify every listener from the calling thread
    pub fn fire(&self) {
        let value = self.value.lock().clone();
        for listener in self.listeners() {
            listener.changed(value.clone());
        }
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().push(thread::current().id());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

impl Target for SlowBean {}

impl Bean for SlowBean {
    fn value(&self) -> String {
        self.enter();
        self.value.lock().clone()
    }

    fn set_value(&self, value: String) {
        self.enter();
        *self.value.lock() = value;
    }

    fn checked_len(&self, value: String) -> Result<usize, BeanError> {
        self.enter();
        if value.is_empty() {
            Err(BeanError::Empty)
        } else {
            Ok(value.len())
        }
    }

    fn explode(&self, message: String) {
        self.enter();
        std::panic::panic_any(message);
    }

    fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.enter();
        self.listeners.lock().push(listener);
    }

    fn remove_change_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.enter();
        self.listeners
            .lock()
            .retain(|existing| !spin::equals(&**existing, &*listener));
    }

    fn listener_count(&self) -> usize {
        self.enter();
        self.listeners.lock().len()
    }
}

/// Listener recording each notification and whether it ran on the loop
pub struct RecordingListener {
    event_loop: EventLoop,
    seen: Mutex<Vec<(String, bool)>>,
}

impl RecordingListener {
    pub fn new(event_loop: &EventLoop) -> Arc<Self> {
        Arc::new(Self {
            event_loop: event_loop.clone(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<(String, bool)> {
        self.seen.lock().clone()
    }
}

impl Target for RecordingListener {}

impl ChangeListener for RecordingListener {
    fn changed(&self, value: String) {
        let on_loop = self.event_loop.is_loop_thread();
        self.seen.lock().push((value, on_loop));
    }
}

/// Poll `condition` for up to five seconds
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Extract a panic message, whichever payload type it was raised with
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        String::from("<non-string panic>")
    }
}
