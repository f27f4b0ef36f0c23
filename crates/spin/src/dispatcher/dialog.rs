//! Modal dialog dispatchers
//!
//! Showing a dialog modally pumps the loop while the dialog is up, so a
//! dialog can serve as a dispatcher. The concealed variant keeps a pool of
//! dialogs placed beyond the screen's bottom-right corner; the revealed
//! variant shows an indeterminate progress dialog over the active window.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eventloop::{Dialog, DialogContent, EventLoop, PumpSignal};
use parking_lot::Mutex;
use tracing::trace;

use super::{Dispatcher, DispatcherFactory};
use crate::error::{Result, SpinError};

const DIALOG_TITLE: &str = "spin";

/// Where dialog dispatchers get their dialogs from and return them to
trait DialogSource: Send + Sync {
    fn release(&self, dialog: Dialog);
}

struct DialogDispatcher {
    event_loop: EventLoop,
    signal: PumpSignal,
    /// Present until the dispatcher is started
    dialog: Mutex<Option<Dialog>>,
    source: Arc<dyn DialogSource>,
}

impl DialogDispatcher {
    fn new(event_loop: &EventLoop, dialog: Dialog, source: Arc<dyn DialogSource>) -> Self {
        Self {
            event_loop: event_loop.clone(),
            signal: event_loop.signal(),
            dialog: Mutex::new(Some(dialog)),
            source,
        }
    }
}

impl Dispatcher for DialogDispatcher {
    fn start(&self) -> Result<()> {
        let mut dialog = self
            .dialog
            .lock()
            .take()
            .ok_or_else(|| SpinError::IllegalState("dialog dispatcher already started".into()))?;

        let shown = dialog.show_modal(&self.event_loop, &self.signal);
        self.source.release(dialog);
        shown?;
        Ok(())
    }

    fn stop(&self) {
        self.signal.raise();
    }
}

impl Drop for DialogDispatcher {
    fn drop(&mut self) {
        if let Some(dialog) = self.dialog.get_mut().take() {
            self.source.release(dialog);
        }
    }
}

#[derive(Default)]
struct DialogPool {
    dialogs: Mutex<Vec<Dialog>>,
    created: AtomicUsize,
}

impl DialogSource for DialogPool {
    fn release(&self, dialog: Dialog) {
        trace!("dialog {} returned to pool", dialog.id().0);
        self.dialogs.lock().push(dialog);
    }
}

/// Dispatches with pooled modal dialogs placed off-screen
///
/// The dialog blocks input to every other window while the call is in
/// flight without anything visible appearing. Dialogs are reused across
/// calls; nested calls each take their own.
#[derive(Clone, Default)]
pub struct ConcealedDialogDispatcherFactory {
    pool: Arc<DialogPool>,
}

impl ConcealedDialogDispatcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a dialog from the pool, creating one if the pool is empty
    ///
    /// The dialog is moved beyond the current screen's bottom-right corner.
    pub fn acquire_dialog(&self, event_loop: &EventLoop) -> Dialog {
        let pooled = self.pool.dialogs.lock().pop();
        let mut dialog = pooled.unwrap_or_else(|| {
            self.pool.created.fetch_add(1, Ordering::SeqCst);
            Dialog::new(None, DIALOG_TITLE)
        });

        let screen = event_loop.screen();
        dialog.set_location(screen.width as i32, screen.height as i32);
        dialog
    }

    /// Return a dialog to the pool
    pub fn release_dialog(&self, dialog: Dialog) {
        self.pool.release(dialog);
    }

    /// Number of dialogs idle in the pool
    pub fn pooled(&self) -> usize {
        self.pool.dialogs.lock().len()
    }

    /// Number of dialogs created so far
    pub fn created(&self) -> usize {
        self.pool.created.load(Ordering::SeqCst)
    }
}

impl DispatcherFactory for ConcealedDialogDispatcherFactory {
    fn create_dispatcher(&self, event_loop: &EventLoop) -> Result<Arc<dyn Dispatcher>> {
        let dialog = self.acquire_dialog(event_loop);
        let source: Arc<dyn DialogSource> = self.pool.clone();
        Ok(Arc::new(DialogDispatcher::new(event_loop, dialog, source)))
    }
}

impl fmt::Debug for ConcealedDialogDispatcherFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcealedDialogDispatcherFactory")
            .field("pooled", &self.pooled())
            .field("created", &self.created())
            .finish()
    }
}

struct Disposer;

impl DialogSource for Disposer {
    fn release(&self, mut dialog: Dialog) {
        dialog.dispose();
    }
}

/// Dispatches with a visible progress dialog over the active window
#[derive(Debug, Default, Clone, Copy)]
pub struct RevealedDialogDispatcherFactory;

impl RevealedDialogDispatcherFactory {
    pub fn new() -> Self {
        Self
    }

    /// Create an undecorated indeterminate progress dialog owned by the
    /// active window and centered on it
    ///
    /// Fails if no window is active.
    pub fn acquire_dialog(&self, event_loop: &EventLoop) -> Result<Dialog> {
        let owner = event_loop.active_window().ok_or_else(|| {
            SpinError::IllegalState("no active window to own the progress dialog".into())
        })?;

        let mut dialog = Dialog::new(Some(owner.id), DIALOG_TITLE);
        dialog.set_decorated(false);
        dialog.set_content(DialogContent::Progress {
            indeterminate: true,
        });
        dialog.pack();
        dialog.center_on(owner.bounds);
        Ok(dialog)
    }
}

impl DispatcherFactory for RevealedDialogDispatcherFactory {
    fn create_dispatcher(&self, event_loop: &EventLoop) -> Result<Arc<dyn Dispatcher>> {
        let dialog = self.acquire_dialog(event_loop)?;
        Ok(Arc::new(DialogDispatcher::new(
            event_loop,
            dialog,
            Arc::new(Disposer),
        )))
    }
}
