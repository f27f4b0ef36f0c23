use std::sync::Arc;

use eventloop::{EventLoop, PumpSignal};

use super::{Dispatcher, DispatcherFactory};
use crate::error::Result;

/// Dispatches by pumping the loop's event queue directly
#[derive(Debug, Default, Clone, Copy)]
pub struct QueueDispatcherFactory;

impl QueueDispatcherFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DispatcherFactory for QueueDispatcherFactory {
    fn create_dispatcher(&self, event_loop: &EventLoop) -> Result<Arc<dyn Dispatcher>> {
        Ok(Arc::new(QueueDispatcher {
            event_loop: event_loop.clone(),
            signal: event_loop.signal(),
        }))
    }
}

struct QueueDispatcher {
    event_loop: EventLoop,
    signal: PumpSignal,
}

impl Dispatcher for QueueDispatcher {
    fn start(&self) -> Result<()> {
        self.event_loop.pump_until(&self.signal)?;
        Ok(())
    }

    fn stop(&self) {
        self.signal.raise();
    }
}
