//! # eventline
//!
//! **Eventline** is a type-safe, in-process publish/subscribe library.
//!
//! Events are declared once as `static` items carrying their argument type.
//! Handlers subscribe to an event through a [`Publisher`] and receive every
//! emission of it; subscriptions are released by dropping the returned
//! [`Subscription`] token or by owner id.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   declare_event! { DATA: i32; }          (static Event<i32>, id #n)
//!                     │
//!                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Publisher (cheap Clone)                                          │
//! │  - Config (label, failure logging, pool size)                     │
//! │  - registries: EventId ──► HandlerRegistry<A>  (created lazily)   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   subscribe(..)      unsubscribe(..)     emit(..) / emit_concurrent(..)
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  HandlerRegistry<A>                                               │
//! │  - entries in subscription order                                  │
//! │  - at most one entry per OwnerId                                  │
//! │  - snapshot, release lock, invoke (failures caught and reported)  │
//! └──────┬──────────────────────────────────────────────┬─────────────┘
//!        ▼                                              ▼
//!   Subscription (RAII token)                  EmitReport { invoked, failures }
//! ```
//!
//! ### Emission modes
//! ```text
//! emit(&EV, args)                        ──► calling thread, subscription order
//! emit_concurrent(&EV, args, policy)     ──► DispatchPolicy::{Sequential, ThreadPerHandler, Pool}
//! emit_with(&EV, args, &executor)        ──► any Executor (join-all)
//! emit_async(&EV, args).await            ──► tokio blocking pool, join-all    [runtime]
//! emit_detached(&EV, args)               ──► tokio blocking pool, no waiting  [runtime]
//! ```
//!
//! ## Features
//! | Area                | Description                                                | Key types / traits                     |
//! |---------------------|------------------------------------------------------------|----------------------------------------|
//! | **Events**          | Static, typed event declarations with dense ids.           | [`Event`], [`EventId`], [`declare_event!`] |
//! | **Ownership**       | Stable owner identity for dedup and unsubscription.        | [`OwnerId`]                            |
//! | **Registry**        | Ordered handler storage for one event.                     | [`HandlerRegistry`], [`HandlerId`]     |
//! | **Publishing**      | Subscribe, unsubscribe and emit by event.                  | [`Publisher`], [`WeakPublisher`]       |
//! | **Outcomes**        | Partial-failure reporting; panics are isolated.            | [`EmitReport`], [`HandlerError`]       |
//! | **Concurrency**     | Pluggable join-all executors.                              | [`DispatchPolicy`], [`Executor`]       |
//! | **Subscribers**     | Multi-event subscribers that detach on drop.               | [`Subscribe`], [`Subscriber`]          |
//!
//! ## Optional features
//! - `runtime` (default): tokio-backed `emit_async` and `emit_detached`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use eventline::{declare_event, OwnerId, Publisher};
//!
//! declare_event! {
//!     /// Fired on every heartbeat.
//!     pub PING: ();
//!     pub DATA: i32;
//! }
//!
//! let publisher = Publisher::new();
//! let pings = Arc::new(AtomicUsize::new(0));
//!
//! let owner = OwnerId::next();
//! let p = Arc::clone(&pings);
//! let _token = publisher.subscribe_owned(&PING, owner, move |_: &()| {
//!     p.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! // A failing handler does not stop the others; emit reports `false`.
//! let _check = publisher.subscribe(&DATA, |v: &i32| -> Result<(), String> {
//!     if *v < 0 { Err(format!("negative: {v}")) } else { Ok(()) }
//! });
//!
//! assert!(publisher.emit(&PING, ()));
//! assert!(!publisher.emit(&DATA, -1));
//!
//! publisher.unsubscribe(&PING, owner);
//! assert!(publisher.emit(&PING, ()));
//! assert_eq!(pings.load(Ordering::SeqCst), 1);
//! ```

mod core;
mod error;
mod events;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Config, EmitReport, HandlerFailure, HandlerId, HandlerOutput, HandlerRegistry, Publisher,
    WeakPublisher,
};
pub use error::{DispatchError, HandlerError};
pub use events::{Event, EventId, OwnerId};
pub use policies::{DispatchPolicy, Executor, Unit};
pub use subscribers::{Attach, Subscribe, Subscriber, Subscription};

#[cfg(feature = "runtime")]
pub use crate::core::DetachedEmission;
