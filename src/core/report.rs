//! # Emission outcome.
//!
//! Every emission produces an [`EmitReport`]: how many handlers were invoked
//! and which of them failed. The boolean `emit` APIs return
//! [`EmitReport::is_success`].

use std::fmt;

use crate::error::HandlerError;
use crate::events::OwnerId;

/// Registry-local identifier of one handler entry.
///
/// Ids grow monotonically within a registry, so ordering by id is
/// subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(pub(crate) u64);

impl HandlerId {
    /// Raw numeric value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// One handler that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Entry that failed.
    pub handler: HandlerId,
    /// Owner of the entry (`None` for anonymous subscriptions).
    pub owner: Option<OwnerId>,
    /// What went wrong.
    pub error: HandlerError,
}

/// Aggregate result of one emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    /// Name of the emitted event.
    pub event: &'static str,
    /// Number of handlers dispatched.
    pub invoked: usize,
    /// Failed handlers, in subscription order.
    pub failures: Vec<HandlerFailure>,
}

impl EmitReport {
    /// Report of an emission that reached no handler.
    pub fn empty(event: &'static str) -> Self {
        Self {
            event,
            invoked: 0,
            failures: Vec::new(),
        }
    }

    /// `true` iff every invoked handler succeeded (vacuously true for none).
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of handlers that succeeded.
    #[inline]
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failures.len()
    }

    /// Collects per-handler outcomes, in subscription order.
    pub(crate) fn collect(
        event: &'static str,
        outcomes: impl IntoIterator<Item = (HandlerId, Option<OwnerId>, Result<(), HandlerError>)>,
    ) -> Self {
        let mut report = Self::empty(event);
        for (handler, owner, outcome) in outcomes {
            report.invoked += 1;
            if let Err(error) = outcome {
                report.failures.push(HandlerFailure {
                    handler,
                    owner,
                    error,
                });
            }
        }
        report
    }
}
