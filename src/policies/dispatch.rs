//! # Execution backends for concurrent emission.
//!
//! Concurrent emission turns every handler invocation into an independent
//! [`Unit`] and hands the batch to an [`Executor`]. The only contract is
//! **join-all**: [`Executor::execute`] returns after every unit it accepted
//! has finished.
//!
//! [`DispatchPolicy`] is the built-in executor:
//! ```text
//! Sequential         caller ─► u1 ─► u2 ─► u3
//!
//! ThreadPerHandler   caller ─┬─► [thread] u1 ─┐
//!                            ├─► [thread] u2 ─┼─► join
//!                            └─► [thread] u3 ─┘
//!
//! Pool { workers }   caller ─┬─► [worker 1] pop ─► u1, u3 ─┐
//!                            └─► [worker 2] pop ─► u2 ─────┴─► join
//! ```
//!
//! ## Rules
//! - Units never unwind: panics are caught inside each unit.
//! - A unit the backend could not start is dropped; the emission reports it
//!   as [`HandlerError::NotRun`](crate::HandlerError::NotRun).
//! - No ordering between units is promised for anything but `Sequential`.
//!
//! ## Custom backends
//! ```rust
//! use eventline::{Executor, Unit};
//!
//! /// Runs units in reverse order on the calling thread.
//! struct Reverse;
//!
//! impl Executor for Reverse {
//!     fn execute<'scope>(&self, units: Vec<Unit<'scope>>) {
//!         for unit in units.into_iter().rev() {
//!             unit();
//!         }
//!     }
//! }
//! ```

use std::num::NonZeroUsize;
use std::thread;

use parking_lot::Mutex;

/// One independent piece of work: a single handler invocation.
pub type Unit<'scope> = Box<dyn FnOnce() + Send + 'scope>;

/// Capability to run a batch of units and wait for all of them.
pub trait Executor: Sync {
    /// Runs every unit and returns once all of them completed.
    ///
    /// Implementations must not return while a unit is still running.
    /// Dropping a unit without calling it is allowed.
    fn execute<'scope>(&self, units: Vec<Unit<'scope>>);
}

/// Built-in execution strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Run on the calling thread in subscription order.
    #[default]
    Sequential,
    /// Spawn one scoped thread per handler.
    ThreadPerHandler,
    /// Fixed number of scoped worker threads sharing one queue.
    ///
    /// `workers = 0` resolves to [`Config::pool_workers`](crate::Config::pool_workers)
    /// when emitting through a publisher, and to the available parallelism otherwise.
    Pool {
        /// Worker thread count (`0` = auto).
        workers: usize,
    },
}

impl DispatchPolicy {
    /// Returns a policy with `Pool { workers: 0 }` replaced by `Pool { workers: default }`.
    #[inline]
    pub fn with_default_workers(self, default: usize) -> Self {
        match self {
            DispatchPolicy::Pool { workers: 0 } => DispatchPolicy::Pool { workers: default },
            other => other,
        }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchPolicy::Sequential => "sequential",
            DispatchPolicy::ThreadPerHandler => "thread_per_handler",
            DispatchPolicy::Pool { .. } => "pool",
        }
    }
}

impl Executor for DispatchPolicy {
    fn execute<'scope>(&self, units: Vec<Unit<'scope>>) {
        match *self {
            DispatchPolicy::Sequential => units.into_iter().for_each(|unit| unit()),
            DispatchPolicy::ThreadPerHandler => run_thread_per_unit(units),
            DispatchPolicy::Pool { workers } => run_pool(workers, units),
        }
    }
}

/// Number of threads the machine can usefully run, at least 1.
pub(crate) fn available_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

fn run_thread_per_unit(units: Vec<Unit<'_>>) {
    thread::scope(|scope| {
        for (idx, unit) in units.into_iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("eventline-unit-{idx}"))
                .spawn_scoped(scope, unit);
            if let Err(err) = spawned {
                tracing::warn!(unit = idx, error = %err, "failed to spawn handler thread");
            }
        }
    });
}

fn run_pool(workers: usize, units: Vec<Unit<'_>>) {
    if units.is_empty() {
        return;
    }
    let workers = match workers {
        0 => available_workers(),
        n => n,
    }
    .min(units.len());

    if workers == 1 {
        units.into_iter().for_each(|unit| unit());
        return;
    }

    let queue = Mutex::new(units.into_iter());
    let drain = || loop {
        let next = queue.lock().next();
        match next {
            Some(unit) => unit(),
            None => break,
        }
    };

    thread::scope(|scope| {
        let mut started = 0;
        for idx in 0..workers {
            match thread::Builder::new()
                .name(format!("eventline-pool-{idx}"))
                .spawn_scoped(scope, &drain)
            {
                Ok(_) => started += 1,
                Err(err) => {
                    tracing::warn!(worker = idx, error = %err, "failed to spawn pool worker");
                }
            }
        }
        // Nothing could be spawned: the caller drains the queue itself.
        if started == 0 {
            drain();
        }
    });
}
