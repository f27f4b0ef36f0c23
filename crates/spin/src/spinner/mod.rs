//! Spinners
//!
//! A [`Spinner`] decides on which thread an [`Invocation`] is evaluated and
//! whether the caller waits for it.
//!
//! - [`OffSpinner`]: moves calls made on the loop thread onto a worker and
//!   keeps the loop pumping until the worker is done
//! - [`OverSpinner`]: moves calls made elsewhere onto the loop thread

mod off;
mod over;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::invocation::Invocation;

pub use off::OffSpinner;
pub use over::OverSpinner;

/// Marshaling discipline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpinnerKind {
    /// Off the loop thread
    Off,
    /// Onto the loop thread
    Over,
}

impl fmt::Display for SpinnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinnerKind::Off => f.write_str("off"),
            SpinnerKind::Over => f.write_str("over"),
        }
    }
}

/// What became of a spun invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spun {
    /// Evaluated; the outcome is ready to be taken
    Completed,
    /// Scheduled without waiting; there is no outcome for the caller
    Detached,
}

/// Evaluates invocations on the right thread
pub trait Spinner: Send + Sync + fmt::Debug {
    fn kind(&self) -> SpinnerKind;

    /// Arrange for `invocation` to be evaluated
    ///
    /// Returns [`Spun::Completed`] only once the invocation has been
    /// evaluated.
    fn spin(&self, invocation: &Arc<Invocation>) -> Result<Spun>;
}
