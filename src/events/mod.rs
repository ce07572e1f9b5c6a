//! Event identity: descriptors and owners.
//!
//! ## Contents
//! - [`Event`], [`EventId`] event descriptors with a fixed argument type
//! - [`declare_event!`](crate::declare_event) declares descriptors as statics
//! - [`OwnerId`] identity used to deduplicate and target subscriptions
//!
//! Registries are keyed by [`EventId`]; the argument type travels with the
//! descriptor, so a registry created through `Event<A>` is only ever read back
//! as a registry of `A` handlers.

mod event;
mod owner;

pub use event::{Event, EventId};
pub use owner::OwnerId;
