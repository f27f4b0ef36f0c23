//! Dispatchers
//!
//! A [`Dispatcher`] keeps the event loop serving events on the loop thread
//! while an off-marshaled call is in flight. `start` blocks in a nested pump
//! until `stop` is called from the worker thread.
//!
//! Three strategies are provided:
//!
//! - [`QueueDispatcherFactory`]: pumps the loop's queue directly
//! - [`ConcealedDialogDispatcherFactory`]: shows a pooled, off-screen modal
//!   dialog that pumps while blocking user input
//! - [`RevealedDialogDispatcherFactory`]: shows a visible progress dialog
//!   centered over the active window

mod dialog;
mod queue;

use std::fmt;
use std::sync::Arc;

use eventloop::EventLoop;

use crate::error::Result;

pub use dialog::{ConcealedDialogDispatcherFactory, RevealedDialogDispatcherFactory};
pub use queue::QueueDispatcherFactory;

/// Keeps events flowing on the loop thread during a wait
pub trait Dispatcher: Send + Sync {
    /// Pump events until [`stop`](Dispatcher::stop) is called
    ///
    /// Must be called on the loop thread. Returns immediately if stop was
    /// already called.
    fn start(&self) -> Result<()>;

    /// Make a pending or future `start` return; callable from any thread
    fn stop(&self);
}

/// Creates a fresh dispatcher for each wait
pub trait DispatcherFactory: Send + Sync + fmt::Debug {
    /// Called on the loop thread, once per off-marshaled call
    fn create_dispatcher(&self, event_loop: &EventLoop) -> Result<Arc<dyn Dispatcher>>;
}
