//! Spin error types

use thiserror::Error;

/// Result type for marshaling operations
pub type Result<T> = std::result::Result<T, SpinError>;

/// Marshaling errors
///
/// Failures of the wrapped call itself never show up here: a returned
/// `Err` travels back inside the result value and a panic is resumed on the
/// caller's thread. These variants describe misuse of the engine.
#[derive(Error, Debug)]
pub enum SpinError {
    /// Event loop error
    #[error("event loop error: {0}")]
    Loop(#[from] eventloop::LoopError),

    /// Argument rejected by a spinner or interceptor
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not possible in the current state
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The pump returned before the invocation was evaluated
    #[error("dispatcher stopped prematurely: {0} was not evaluated")]
    PrematureStop(String),

    /// Evaluation attempted a second time
    #[error("{0} has already been evaluated")]
    AlreadyEvaluated(String),

    /// Result requested before evaluation finished
    #[error("{0} has not been evaluated")]
    NotEvaluated(String),

    /// The evaluated value does not have the method's return type
    #[error("result of {method} is not a {expected}")]
    ResultMismatch {
        method: String,
        expected: &'static str,
    },

    /// Worker could not be started
    #[error("failed to start worker: {0}")]
    Start(#[from] std::io::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl SpinError {
    /// Whether this error is a protocol violation that must abort the call
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SpinError::InvalidArgument(_)
                | SpinError::IllegalState(_)
                | SpinError::PrematureStop(_)
                | SpinError::AlreadyEvaluated(_)
                | SpinError::NotEvaluated(_)
                | SpinError::ResultMismatch { .. }
                | SpinError::Loop(_)
        )
    }
}
