//! Dispatch core: per-event registries and the publisher that owns them.
//!
//! Internal modules:
//! - [`config`]: publisher-wide settings;
//! - [`handler`]: type-erased callbacks and panic isolation;
//! - [`registry`]: ordered, owner-deduplicated handler storage for one event;
//! - [`report`]: outcome of one emission;
//! - [`publisher`]: event-keyed registries behind one handle;
//! - `runtime`: tokio-backed emission (feature `runtime`).

mod config;
mod handler;
mod publisher;
mod registry;
mod report;
#[cfg(feature = "runtime")]
mod runtime;

pub use config::Config;
pub use handler::HandlerOutput;
pub use publisher::{Publisher, WeakPublisher};
pub use registry::HandlerRegistry;
pub use report::{EmitReport, HandlerFailure, HandlerId};
#[cfg(feature = "runtime")]
pub use runtime::DetachedEmission;

pub(crate) use publisher::method_callback;
