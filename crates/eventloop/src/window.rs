//! Headless window table
//!
//! The loop keeps just enough window state for modal pumps: the screen
//! size, the open top-level frames, which frame is active, and the stack of
//! dialogs currently shown modally. Nothing here renders anything.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::{LoopError, Result};
use crate::event_loop::{EventLoop, PumpSignal};

/// Unique identifier for a window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl WindowId {
    /// Generate a new window ID
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Window geometry in screen coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Center point
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

/// Size of the visible display area
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// An open top-level window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub id: WindowId,
    pub title: String,
    pub bounds: Rect,
}

#[derive(Debug, Default)]
pub(crate) struct WindowTable {
    screen: Screen,
    frames: Vec<Frame>,
    active: Option<WindowId>,
    modal: Vec<WindowId>,
}

impl EventLoop {
    /// Get the screen size
    pub fn screen(&self) -> Screen {
        self.windows().screen
    }

    /// Replace the screen size
    pub fn set_screen(&self, screen: Screen) {
        self.windows().screen = screen;
    }

    /// Open a top-level frame and make it the active window
    pub fn open_frame(&self, title: impl Into<String>, bounds: Rect) -> WindowId {
        let id = WindowId::generate();
        let mut windows = self.windows();
        windows.frames.push(Frame {
            id,
            title: title.into(),
            bounds,
        });
        windows.active = Some(id);
        id
    }

    /// Make an open frame the active window
    pub fn activate(&self, id: WindowId) -> Result<()> {
        let mut windows = self.windows();
        if !windows.frames.iter().any(|frame| frame.id == id) {
            return Err(LoopError::WindowNotFound(id.0));
        }
        windows.active = Some(id);
        Ok(())
    }

    /// Clear the active window without closing anything
    pub fn deactivate(&self) {
        self.windows().active = None;
    }

    /// Close a frame; it stops being active if it was
    pub fn close_frame(&self, id: WindowId) -> Result<()> {
        let mut windows = self.windows();
        let before = windows.frames.len();
        windows.frames.retain(|frame| frame.id != id);
        if windows.frames.len() == before {
            return Err(LoopError::WindowNotFound(id.0));
        }
        if windows.active == Some(id) {
            windows.active = None;
        }
        Ok(())
    }

    /// Get the active frame, if any
    pub fn active_window(&self) -> Option<Frame> {
        let windows = self.windows();
        let active = windows.active?;
        windows.frames.iter().find(|frame| frame.id == active).cloned()
    }

    /// Get an open frame by ID
    pub fn frame(&self, id: WindowId) -> Option<Frame> {
        self.windows().frames.iter().find(|frame| frame.id == id).cloned()
    }

    /// Number of dialogs currently shown modally
    pub fn modal_depth(&self) -> usize {
        self.windows().modal.len()
    }
}

/// What a dialog displays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogContent {
    Empty,
    /// A progress bar; indeterminate when the amount of work is unknown
    Progress { indeterminate: bool },
}

/// A modal dialog
///
/// Showing a dialog modally runs the loop's own pump until the dialog's
/// stop signal is raised, so the dialog itself serves as the pump.
#[derive(Debug)]
pub struct Dialog {
    id: WindowId,
    title: String,
    owner: Option<WindowId>,
    bounds: Rect,
    decorated: bool,
    content: DialogContent,
    visible: bool,
    disposed: bool,
    times_shown: u64,
}

impl Dialog {
    /// Create a hidden dialog, optionally owned by a frame
    pub fn new(owner: Option<WindowId>, title: impl Into<String>) -> Self {
        Self {
            id: WindowId::generate(),
            title: title.into(),
            owner,
            bounds: Rect::default(),
            decorated: true,
            content: DialogContent::Empty,
            visible: false,
            disposed: false,
            times_shown: 0,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner(&self) -> Option<WindowId> {
        self.owner
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_decorated(&self) -> bool {
        self.decorated
    }

    pub fn set_decorated(&mut self, decorated: bool) {
        self.decorated = decorated;
    }

    pub fn content(&self) -> DialogContent {
        self.content
    }

    pub fn set_content(&mut self, content: DialogContent) {
        self.content = content;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// How often the dialog has been shown
    pub fn times_shown(&self) -> u64 {
        self.times_shown
    }

    /// Size the dialog to fit its content
    pub fn pack(&mut self) {
        let (width, height) = match self.content {
            DialogContent::Empty => (0, 0),
            DialogContent::Progress { .. } => (240, 24),
        };
        self.bounds.width = width;
        self.bounds.height = height;
    }

    /// Move the dialog's top-left corner
    pub fn set_location(&mut self, x: i32, y: i32) {
        self.bounds.x = x;
        self.bounds.y = y;
    }

    /// Center the dialog over `area`
    pub fn center_on(&mut self, area: Rect) {
        let (cx, cy) = area.center();
        self.bounds.x = cx - (self.bounds.width / 2) as i32;
        self.bounds.y = cy - (self.bounds.height / 2) as i32;
    }

    /// Check whether the dialog lies entirely outside the screen
    pub fn is_off_screen(&self, screen: Screen) -> bool {
        self.bounds.x >= screen.width as i32 || self.bounds.y >= screen.height as i32
    }

    /// Show the dialog modally until `until` is raised
    ///
    /// Must be called on the loop thread; events keep running while the
    /// dialog is up.
    pub fn show_modal(&mut self, event_loop: &EventLoop, until: &PumpSignal) -> Result<()> {
        if self.disposed {
            return Err(LoopError::WindowNotFound(self.id.0));
        }
        event_loop.ensure_loop_thread()?;

        self.visible = true;
        self.times_shown += 1;
        event_loop.windows().modal.push(self.id);
        trace!("dialog {} shown modally", self.id.0);

        let pumped = event_loop.pump_until(until);

        event_loop.windows().modal.retain(|id| *id != self.id);
        self.visible = false;
        trace!("dialog {} hidden", self.id.0);
        pumped
    }

    /// Release the dialog for good
    pub fn dispose(&mut self) {
        self.visible = false;
        self.disposed = true;
    }
}
