//! Single-threaded cooperative event loop
//!
//! This crate provides the loop thread that the `spin` crate marshals calls
//! off and onto. It mirrors what a UI toolkit's event dispatch thread offers:
//!
//! - A FIFO queue of events run by one dedicated thread
//! - Run-later and run-and-wait scheduling from any thread
//! - Reentrant pumping: code on the loop thread can wait for a signal while
//!   queued events keep running, nested to any depth
//! - Loop-thread identity checks and threading assertions
//! - A headless window table (screen, frames, active window, modal dialogs)
//!
//! # Example
//!
//! ```no_run
//! use eventloop::EventLoop;
//!
//! let (event_loop, join) = EventLoop::spawn("ui").unwrap();
//! let on_loop = event_loop.clone();
//! let answer = event_loop
//!     .invoke_and_wait(move || {
//!         on_loop.assert_loop_thread();
//!         42
//!     })
//!     .unwrap();
//! assert_eq!(answer, 42);
//!
//! event_loop.shutdown();
//! join.join().unwrap();
//! ```

pub mod error;
mod event_loop;
mod window;

pub use error::{LoopError, Result};
pub use event_loop::{Event, EventLoop, PumpSignal};
pub use window::{Dialog, DialogContent, Frame, Rect, Screen, WindowId};

/// Thread name of the process-wide loop returned by [`EventLoop::main`]
pub const MAIN_LOOP_NAME: &str = "spin-loop";
