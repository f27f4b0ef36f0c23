use std::sync::Arc;

use eventloop::EventLoop;
use tracing::{trace, warn};

use super::{Spinner, SpinnerKind, Spun};
use crate::dispatcher::{Dispatcher, DispatcherFactory, QueueDispatcherFactory};
use crate::error::{Result, SpinError};
use crate::invocation::Invocation;
use crate::starter::{Starter, ThreadStarter};

/// Moves evaluation off the loop thread
///
/// Called on the loop thread, the invocation is handed to the starter and
/// the caller pumps a fresh dispatcher until the worker has evaluated it,
/// so the loop keeps serving events in the meantime. Called anywhere else
/// the invocation is evaluated in place.
#[derive(Debug, Clone)]
pub struct OffSpinner {
    event_loop: EventLoop,
    starter: Arc<dyn Starter>,
    dispatcher_factory: Arc<dyn DispatcherFactory>,
}

impl OffSpinner {
    pub fn new(
        event_loop: EventLoop,
        starter: Arc<dyn Starter>,
        dispatcher_factory: Arc<dyn DispatcherFactory>,
    ) -> Self {
        Self {
            event_loop,
            starter,
            dispatcher_factory,
        }
    }

    /// Thread-per-call starter and queue dispatching
    pub fn with_defaults(event_loop: EventLoop) -> Self {
        Self::new(
            event_loop,
            Arc::new(ThreadStarter::new()),
            Arc::new(QueueDispatcherFactory),
        )
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn starter(&self) -> &Arc<dyn Starter> {
        &self.starter
    }

    pub fn dispatcher_factory(&self) -> &Arc<dyn DispatcherFactory> {
        &self.dispatcher_factory
    }
}

impl Spinner for OffSpinner {
    fn kind(&self) -> SpinnerKind {
        SpinnerKind::Off
    }

    fn spin(&self, invocation: &Arc<Invocation>) -> Result<Spun> {
        if !self.event_loop.is_loop_thread() {
            invocation.evaluate()?;
            return Ok(Spun::Completed);
        }

        let dispatcher = self.dispatcher_factory.create_dispatcher(&self.event_loop)?;

        let worker_invocation = Arc::clone(invocation);
        let stop = StopOnDrop(Arc::clone(&dispatcher));
        self.starter.start(Box::new(move || {
            let _stop = stop;
            if let Err(e) = worker_invocation.evaluate() {
                warn!("off-loop evaluation failed: {}", e);
            }
        }))?;

        trace!(
            "invocation {} of {} started off the loop, dispatching",
            invocation.id(),
            invocation.method()
        );
        dispatcher.start()?;

        if !invocation.is_evaluated() {
            return Err(SpinError::PrematureStop(invocation.method().to_string()));
        }
        Ok(Spun::Completed)
    }
}

/// Stops the dispatcher once the work has run, or was dropped unrun
struct StopOnDrop(Arc<dyn Dispatcher>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}
