//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for objects that listen to several
//! events of one or more publishers. The object describes **what** to
//! subscribe; [`Subscriber`](crate::Subscriber) owns the bookkeeping and the
//! teardown.
//!
//! ## Contract
//! - [`Subscribe::subscribe_to`] registers handlers through [`Attach`]; every
//!   token it creates is kept by the wrapping `Subscriber`.
//! - [`Subscribe::unsubscribe_from`] removes exactly this object's handlers
//!   (those made under the given owner id) from one publisher.
//! - Handlers registered with [`Attach::on`] hold the object weakly.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use eventline::{declare_event, Attach, OwnerId, Publisher, Subscribe, Subscriber};
//!
//! declare_event! {
//!     PING: ();
//! }
//!
//! #[derive(Default)]
//! struct Pings(AtomicU32);
//!
//! impl Pings {
//!     fn on_ping(&self, _: &()) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! impl Subscribe for Pings {
//!     fn subscribe_to(&self, attach: &mut Attach<'_, Self>) {
//!         attach.on(&PING, Pings::on_ping);
//!     }
//!
//!     fn unsubscribe_from(&self, publisher: &Publisher, owner: OwnerId) {
//!         publisher.unsubscribe(&PING, owner);
//!     }
//! }
//!
//! let publisher = Publisher::new();
//! let mut pings = Subscriber::new(Pings::default());
//! pings.subscribe_to(&publisher);
//! publisher.emit(&PING, ());
//! assert_eq!(pings.0.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;

use crate::core::{method_callback, HandlerOutput, Publisher};
use crate::events::{Event, OwnerId};
use crate::subscribers::Subscription;

/// Contract for multi-event subscribers.
pub trait Subscribe: Send + Sync + Sized + 'static {
    /// Registers this object's handlers on `attach.publisher()`.
    fn subscribe_to(&self, attach: &mut Attach<'_, Self>);

    /// Removes every handler registered under `owner` from `publisher`.
    fn unsubscribe_from(&self, publisher: &Publisher, owner: OwnerId);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Subscription context handed to [`Subscribe::subscribe_to`].
///
/// Subscribes on behalf of the subscriber's owner id and keeps the tokens.
pub struct Attach<'a, S> {
    publisher: &'a Publisher,
    target: &'a Arc<S>,
    owner: OwnerId,
    tokens: &'a mut Vec<Subscription>,
}

impl<'a, S> Attach<'a, S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(
        publisher: &'a Publisher,
        target: &'a Arc<S>,
        owner: OwnerId,
        tokens: &'a mut Vec<Subscription>,
    ) -> Self {
        Self {
            publisher,
            target,
            owner,
            tokens,
        }
    }

    /// Publisher being subscribed to.
    pub fn publisher(&self) -> &Publisher {
        self.publisher
    }

    /// Owner id of the subscriber.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Subscribes `method` of the subscriber to `event`.
    ///
    /// Subscribing the same event twice keeps the first handler.
    pub fn on<A, R>(
        &mut self,
        event: &'static Event<A>,
        method: fn(&S, &A) -> R,
    ) -> &mut Self
    where
        A: 'static,
        R: HandlerOutput + 'static,
    {
        let token = self.publisher.subscribe_callback(
            event,
            Some(self.owner),
            method_callback(self.target, method),
        );
        self.tokens.push(token);
        self
    }

    /// Subscribes a closure to `event` under the subscriber's owner id.
    pub fn on_fn<A, F, R>(&mut self, event: &'static Event<A>, handler: F) -> &mut Self
    where
        A: 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        let token = self.publisher.subscribe_owned(event, self.owner, handler);
        self.tokens.push(token);
        self
    }

    /// Keeps any other token alive for as long as the subscriber is attached.
    pub fn store(&mut self, token: Subscription) -> &mut Self {
        self.tokens.push(token);
        self
    }
}
