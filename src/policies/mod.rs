//! Dispatch policies.
//!
//! This module groups the knobs that control **where** handler invocations run
//! during concurrent emission.
//!
//! ## Contents
//! - [`Executor`] join-all backend contract ("run N units, wait for all")
//! - [`DispatchPolicy`] built-in backends (sequential / thread per handler / pool)
//! - [`Unit`] one boxed handler invocation
//!
//! ## Quick wiring
//! ```text
//! Publisher::emit_concurrent(event, args, policy)
//!      └─► HandlerRegistry::emit_with(args, &policy)
//!           └─► policy.execute(units)   // returns after every unit finished
//! ```
//!
//! ## Defaults
//! - `DispatchPolicy::Sequential`.
//! - `Pool { workers: 0 }` sizes itself from [`Config`](crate::Config).

mod dispatch;

pub(crate) use dispatch::available_workers;
pub use dispatch::{DispatchPolicy, Executor, Unit};
