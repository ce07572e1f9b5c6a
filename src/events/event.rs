//! # Event descriptors.
//!
//! An [`Event`] pairs a fixed argument type `A` with a process-unique
//! [`EventId`]. Handlers for the event are `Fn(&A)`; use `()` for events
//! without arguments and a tuple for events with several.
//!
//! ## Identity
//! Identity belongs to the **declaration**, not to the argument type:
//! two statics with the same `A` are two different events.
//!
//! Ids are assigned lazily from a global counter the first time a
//! descriptor's id is read, so they are dense (`0, 1, 2, ...`) and need no
//! registration step. Each static owns its own slot, therefore the same
//! declaration always yields the same id for the life of the process.
//!
//! Descriptors must live in `static` items; [`declare_event!`] emits the
//! `static` for you. Publishers and registries take `&'static Event<A>`, and
//! a `const` descriptor holding a `OnceLock` is never promoted to `'static`,
//! so passing one does not compile.
//! ```compile_fail
//! use eventline::{Event, HandlerRegistry};
//!
//! const TICK: Event<u32> = Event::new("tick");
//!
//! let registry = HandlerRegistry::new(&TICK);
//! ```
//!
//! ## Example
//! ```rust
//! use eventline::{declare_event, Event};
//!
//! declare_event! {
//!     /// Fired on every heartbeat.
//!     pub PING: ();
//!     pub DATA: i32;
//! }
//! static RESIZE: Event<(u32, u32)> = Event::new("resize");
//!
//! assert_ne!(PING.id(), DATA.id());
//! assert_eq!(PING.id(), PING.id());
//! assert_eq!(RESIZE.name(), "resize");
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::OnceLock;

/// Global counter for event id assignment.
static NEXT_EVENT_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identifier of one event declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u32);

impl EventId {
    /// Raw numeric value.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Descriptor of an event whose handlers take `&A`.
///
/// Not `Clone`: a descriptor is its own identity. Pass it by reference.
pub struct Event<A> {
    name: &'static str,
    id: OnceLock<EventId>,
    _signature: PhantomData<fn(&A)>,
}

impl<A> Event<A> {
    /// Declares a new event. Store the result in a `static`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            id: OnceLock::new(),
            _signature: PhantomData,
        }
    }

    /// Returns this declaration's id, assigning it on first use.
    ///
    /// # Panics
    /// If more than `u32::MAX` descriptors have been assigned an id.
    pub fn id(&self) -> EventId {
        *self.id.get_or_init(next_event_id)
    }

    /// Declared name (for logs and reports).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn next_event_id() -> EventId {
    match NEXT_EVENT_ID.fetch_update(AtomicOrdering::Relaxed, AtomicOrdering::Relaxed, |n| {
        n.checked_add(1)
    }) {
        Ok(id) => EventId(id),
        Err(_) => panic!("event id space exhausted"),
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("id", &self.id.get())
            .field("args", &std::any::type_name::<A>())
            .finish()
    }
}

/// Declares one or more event descriptors as `static` items.
///
/// ```rust
/// eventline::declare_event! {
///     pub(crate) STARTED: ();
///     PROGRESS: (u64, u64);
/// }
/// assert_eq!(PROGRESS.name(), "PROGRESS");
/// ```
#[macro_export]
macro_rules! declare_event {
    ($($(#[$meta:meta])* $vis:vis $name:ident : $args:ty;)+) => {
        $(
            $(#[$meta])*
            $vis static $name: $crate::Event<$args> = $crate::Event::new(stringify!($name));
        )+
    };
}
