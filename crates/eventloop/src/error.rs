//! Error types for the event loop

use thiserror::Error;

/// Result type for event loop operations
pub type Result<T> = std::result::Result<T, LoopError>;

/// Event loop errors
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("not on the loop thread of '{0}'")]
    NotLoopThread(String),

    #[error("'{0}' is already driven by another thread")]
    AlreadyBound(String),

    #[error("cannot wait on '{0}' from its own loop thread")]
    WouldDeadlock(String),

    #[error("event loop '{0}' is closed")]
    Closed(String),

    #[error("event dropped before completion on '{0}'")]
    Dropped(String),

    #[error("no active window")]
    NoActiveWindow,

    #[error("window not found: {0}")]
    WindowNotFound(u64),

    #[error("failed to spawn loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}
