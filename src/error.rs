//! Error types used by handlers and dispatch backends.
//!
//! This module defines two enums:
//!
//! - [`HandlerError`]: why a single handler invocation did not succeed.
//! - [`DispatchError`]: why an emission could not be dispatched at all.
//!
//! Handler errors never escape an emission; they are collected into an
//! [`EmitReport`](crate::EmitReport). Both types provide `as_label` for
//! logs/metrics.

use std::fmt::Display;

use thiserror::Error;

/// # Failure of a single handler invocation.
///
/// Produced while emitting; one failing handler never stops the others.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler returned an error value.
    #[error("handler failed: {message}")]
    Failed {
        /// Rendered error returned by the handler.
        message: String,
    },

    /// Handler panicked; the panic was caught at the invocation boundary.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },

    /// Handler was queued on an async runtime that shut down before it ran.
    #[error("handler cancelled before completion")]
    Cancelled,

    /// Execution backend dropped the unit without running it.
    #[error("handler was not run by the executor")]
    NotRun,
}

impl HandlerError {
    /// Builds [`HandlerError::Failed`] from any displayable error.
    pub fn failed(err: impl Display) -> Self {
        HandlerError::Failed {
            message: err.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventline::HandlerError;
    ///
    /// let err = HandlerError::failed("disk full");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// assert_eq!(err.to_string(), "handler failed: disk full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Cancelled => "handler_cancelled",
            HandlerError::NotRun => "handler_not_run",
        }
    }
}

/// # Errors produced before any handler is dispatched.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Detached emission needs a tokio runtime on the calling thread.
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::NoRuntime => "dispatch_no_runtime",
        }
    }
}
