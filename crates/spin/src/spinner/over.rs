use std::sync::Arc;

use eventloop::EventLoop;
use tracing::{error, trace, warn};

use super::{Spinner, SpinnerKind, Spun};
use crate::error::{Result, SpinError};
use crate::invocation::Invocation;

/// Moves evaluation onto the loop thread
///
/// Called on the loop thread, the invocation is evaluated in place.
/// Anywhere else it is queued on the loop; by default the caller waits for
/// it, otherwise the call is fire-and-forget, which is only allowed for
/// methods returning nothing. A value call made on the loop thread through
/// a fire-and-forget spinner still runs in place and returns its value.
#[derive(Debug, Clone)]
pub struct OverSpinner {
    event_loop: EventLoop,
    wait: bool,
}

impl OverSpinner {
    /// Waiting spinner
    pub fn new(event_loop: EventLoop) -> Self {
        Self::with_wait(event_loop, true)
    }

    pub fn with_wait(event_loop: EventLoop, wait: bool) -> Self {
        Self { event_loop, wait }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Whether callers wait for the loop to evaluate
    pub fn waits(&self) -> bool {
        self.wait
    }
}

impl Spinner for OverSpinner {
    fn kind(&self) -> SpinnerKind {
        SpinnerKind::Over
    }

    fn spin(&self, invocation: &Arc<Invocation>) -> Result<Spun> {
        if self.event_loop.is_loop_thread() {
            invocation.evaluate()?;
            return Ok(Spun::Completed);
        }

        let method = invocation.method();
        let scheduled = Arc::clone(invocation);

        if self.wait {
            self.event_loop.invoke_and_wait(move || {
                if let Err(e) = scheduled.evaluate() {
                    warn!("loop evaluation failed: {}", e);
                }
            })?;
            return Ok(Spun::Completed);
        }

        if method.returns_value() {
            return Err(SpinError::InvalidArgument(format!(
                "cannot spin {} over without waiting: it returns a value",
                method
            )));
        }

        self.event_loop.invoke_later(move || {
            if let Err(e) = scheduled.evaluate() {
                warn!("loop evaluation failed: {}", e);
            } else if scheduled.panicked() {
                // Nobody collects a detached outcome
                error!(
                    "detached invocation {} of {} panicked",
                    scheduled.id(),
                    scheduled.method()
                );
            }
        })?;
        trace!("invocation {} of {} queued on the loop", invocation.id(), method);
        Ok(Spun::Detached)
    }
}
