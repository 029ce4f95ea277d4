//! Crate error types.
//!
//! Two kinds of failure exist in the engine:
//! - [`Rejection`] is a *value*: the reason a promise settled unsuccessfully.
//!   It flows through chains, is handed to `otherwise` handlers, and can be
//!   inspected to tell cancellation apart from ordinary failure.
//! - [`PromiseError`] is an *operation* error: settling a promise twice,
//!   or waiting on a promise the loop can never settle.

use std::rc::Rc;

use thiserror::Error;

/// The reason a promise was rejected.
///
/// Rejection reasons are cloned into every subscriber, so arbitrary
/// application errors are carried behind an `Rc`.
#[derive(Debug, Clone, Error)]
pub enum Rejection {
    /// The promise was cancelled before it could settle.
    #[error("promise has been cancelled")]
    Cancelled,

    /// The operation failed with a plain message.
    #[error("{0}")]
    Message(String),

    /// The operation failed with an application error.
    #[error("{0}")]
    Failed(Rc<dyn std::error::Error>),
}

impl Rejection {
    /// Wraps an application error as a rejection reason.
    pub fn failed(err: impl std::error::Error + 'static) -> Self {
        Self::Failed(Rc::new(err))
    }

    /// Builds a message rejection.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this rejection came from cancellation rather than failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors reported by promise operations.
#[derive(Debug, Clone, Error)]
pub enum PromiseError {
    /// A second fulfill or reject was attempted on a settled promise.
    #[error("promise is already settled and cannot be settled again")]
    AlreadySettled,

    /// `wait` ran the loop dry while the promise was still pending.
    ///
    /// Nothing left in the loop can settle the promise, so blocking any
    /// longer would hang forever.
    #[error("no more events in the loop; this promise will never settle")]
    Starved,

    /// The awaited promise was rejected.
    #[error(transparent)]
    Rejected(#[from] Rejection),
}
