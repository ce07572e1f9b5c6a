//! # Tokio-backed emission (`runtime` feature).
//!
//! Two variants on top of [`HandlerRegistry`]:
//!
//! - [`HandlerRegistry::emit_async`]: every handler runs on tokio's blocking
//!   pool; the future resolves once **all** of them finished (join-all).
//! - [`HandlerRegistry::emit_detached`]: fire-and-forget. Handlers are spawned
//!   and a [`DetachedEmission`] is returned immediately.
//!
//! ## Detached mode and shutdown
//! ```text
//! emit_detached(args) ──► spawn_blocking(h1), spawn_blocking(h2), ...
//!        │
//!        └─► DetachedEmission ──┬─► dropped: handlers keep running
//!                               └─► join().await: EmitReport
//! ```
//! Handlers already running when the runtime shuts down run to completion;
//! handlers still queued are cancelled and never run. A later `join` reports
//! them as [`HandlerError::Cancelled`]. Use `emit_async` when every side
//! effect must be visible after the call.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::core::handler::invoke;
use crate::core::registry::HandlerRegistry;
use crate::core::report::{EmitReport, HandlerId};
use crate::error::{DispatchError, HandlerError};
use crate::events::OwnerId;

type Pending = (HandlerId, Option<OwnerId>, JoinHandle<Result<(), HandlerError>>);

/// Handlers of one detached emission, possibly still running.
///
/// Dropping it does not cancel anything.
pub struct DetachedEmission {
    event: &'static str,
    pending: Vec<Pending>,
}

impl DetachedEmission {
    /// Emission with no handlers, valid only inside a tokio runtime.
    pub(crate) fn none(event: &'static str) -> Result<Self, DispatchError> {
        Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        Ok(Self {
            event,
            pending: Vec::new(),
        })
    }

    /// Number of dispatched handlers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no handler was dispatched.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns true once every dispatched handler has finished.
    pub fn is_finished(&self) -> bool {
        self.pending.iter().all(|(_, _, join)| join.is_finished())
    }

    /// Waits for every dispatched handler and reports the outcome.
    pub async fn join(self) -> EmitReport {
        let (meta, joins): (Vec<_>, Vec<_>) = self
            .pending
            .into_iter()
            .map(|(id, owner, join)| ((id, owner), join))
            .unzip();
        let results = join_all(joins).await;

        EmitReport::collect(
            self.event,
            meta.into_iter()
                .zip(results)
                .map(|((id, owner), res)| (id, owner, res.unwrap_or_else(join_failure))),
        )
    }
}

impl fmt::Debug for DetachedEmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachedEmission")
            .field("event", &self.event)
            .field("handlers", &self.pending.len())
            .finish()
    }
}

impl<A> HandlerRegistry<A>
where
    A: Send + Sync + 'static,
{
    /// Runs every handler on tokio's blocking pool and waits for all of them.
    ///
    /// Outside a tokio runtime the handlers run inline, in subscription order.
    pub async fn emit_async(&self, args: A) -> EmitReport {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!(event = self.event_name(), "no tokio runtime; emitting inline");
            return self.emit_report(&args);
        };
        let Some(detached) = self.spawn_all(&handle, args) else {
            return EmitReport::empty(self.event_name());
        };
        let report = detached.join().await;
        self.finish("async", report)
    }

    /// Spawns every handler on the current tokio runtime without waiting.
    ///
    /// # Errors
    /// [`DispatchError::NoRuntime`] if the calling thread is not inside a tokio runtime.
    pub fn emit_detached(&self, args: A) -> Result<DetachedEmission, DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let detached = self
            .spawn_all(&handle, args)
            .unwrap_or_else(|| DetachedEmission {
                event: self.event_name(),
                pending: Vec::new(),
            });
        tracing::trace!(
            event = self.event_name(),
            dispatched = detached.len(),
            "event emitted detached"
        );
        Ok(detached)
    }

    fn spawn_all(&self, handle: &Handle, args: A) -> Option<DetachedEmission> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return None;
        }
        let args = Arc::new(args);
        let pending = snapshot
            .into_iter()
            .map(|entry| {
                let args = Arc::clone(&args);
                let callback = entry.callback;
                let join = handle.spawn_blocking(move || invoke(&callback, &*args));
                (entry.id, entry.owner, join)
            })
            .collect();
        Some(DetachedEmission {
            event: self.event_name(),
            pending,
        })
    }
}

fn join_failure(err: JoinError) -> Result<(), HandlerError> {
    if err.is_cancelled() {
        return Err(HandlerError::Cancelled);
    }
    Err(HandlerError::Panicked {
        message: err.to_string(),
    })
}
