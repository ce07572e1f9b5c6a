//! # Publisher - single entry point for subscribe / unsubscribe / emit.
//!
//! A [`Publisher`] owns one [`HandlerRegistry`] per event, created lazily on
//! the first subscription to that event.
//!
//! ## Architecture
//! ```text
//! Publisher (cheap Clone, shared state)
//!   └─► registries: RwLock<HashMap<EventId, Arc<dyn Any>>>
//!          ├─► #0 ──► HandlerRegistry<()>
//!          ├─► #1 ──► HandlerRegistry<i32>
//!          └─► #2 ──► HandlerRegistry<(String, u8)>
//!
//! subscribe(&EV, cb) ──► registry(&EV).add(cb) ──► Subscription(weak registry, handler id)
//! emit(&EV, args)    ──► lookup(&EV)?.emit(&args)
//! ```
//!
//! ## Type safety
//! The map is type-erased, but it is only ever read through an `Event<A>`.
//! Every entry point takes `&'static Event<A>`, so an id belongs to exactly
//! one `static` declaration, and that declaration fixes `A`. The downcast
//! back to `HandlerRegistry<A>` therefore always matches.
//!
//! A `const` descriptor is rejected at compile time: each use would be a
//! fresh temporary with its own id.
//! ```compile_fail
//! use eventline::{Event, Publisher};
//!
//! const PING: Event<()> = Event::new("ping");
//!
//! let publisher = Publisher::new();
//! let _token = publisher.subscribe(&PING, |_: &()| {});
//! ```
//!
//! ## Rules
//! - Registries live as long as the last `Publisher` clone.
//! - Emitting an event nobody subscribed to returns `true` without allocating a registry.
//! - Tokens never keep a registry alive (weak references).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::core::config::Config;
use crate::core::handler::{callback, Callback, HandlerOutput};
use crate::core::registry::HandlerRegistry;
use crate::core::report::EmitReport;
use crate::events::{Event, EventId, OwnerId};
use crate::policies::{DispatchPolicy, Executor};
use crate::subscribers::Subscription;

#[cfg(feature = "runtime")]
use crate::{core::runtime::DetachedEmission, error::DispatchError};

type ErasedRegistry = Arc<dyn Any + Send + Sync>;

struct Shared {
    config: Arc<Config>,
    registries: RwLock<HashMap<EventId, ErasedRegistry>>,
}

/// Event hub: holds handler registries and dispatches emissions.
///
/// ### Properties
/// - **Cloneable**: cheap to clone; all clones share the same registries.
/// - **Thread-safe**: subscribe, unsubscribe and emit may race freely.
/// - **Best effort**: handler failures are reported, never propagated.
///
/// ### Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use eventline::{declare_event, Publisher};
///
/// declare_event! { DATA: i64; }
///
/// let publisher = Publisher::new();
/// let sum = Arc::new(AtomicI64::new(0));
/// let acc = Arc::clone(&sum);
/// let token = publisher.subscribe(&DATA, move |v: &i64| {
///     acc.fetch_add(*v, Ordering::SeqCst);
/// });
///
/// assert!(publisher.emit(&DATA, 42));
/// assert!(publisher.emit(&DATA, 8));
/// assert_eq!(sum.load(Ordering::SeqCst), 50);
///
/// drop(token);
/// assert_eq!(publisher.subscriber_count(&DATA), 0);
/// ```
#[derive(Clone)]
pub struct Publisher {
    shared: Arc<Shared>,
}

/// Non-owning reference to a [`Publisher`].
#[derive(Clone)]
pub struct WeakPublisher {
    shared: Weak<Shared>,
}

impl Publisher {
    /// Creates a publisher with default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a publisher with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                registries: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns a weak handle that does not keep registries alive.
    pub fn downgrade(&self) -> WeakPublisher {
        WeakPublisher {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Returns true if both handles share the same registries.
    pub fn ptr_eq(&self, other: &Publisher) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ---------------------------
    // Subscribe / unsubscribe
    // ---------------------------

    /// Subscribes an anonymous handler.
    ///
    /// Dropping the returned token removes exactly this handler.
    pub fn subscribe<A, F, R>(&self, event: &'static Event<A>, handler: F) -> Subscription
    where
        A: 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.subscribe_callback(event, None, callback(handler))
    }

    /// Subscribes a handler on behalf of `owner`.
    ///
    /// If `owner` is already subscribed to `event` nothing is added and the
    /// token refers to the existing entry.
    pub fn subscribe_owned<A, F, R>(
        &self,
        event: &'static Event<A>,
        owner: OwnerId,
        handler: F,
    ) -> Subscription
    where
        A: 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.subscribe_callback(event, Some(owner), callback(handler))
    }

    /// Subscribes `method` of `target`, owned by `target`'s address.
    ///
    /// The target is captured weakly; once it is dropped the handler is a
    /// successful no-op until it is unsubscribed.
    pub fn subscribe_method<A, T, R>(
        &self,
        event: &'static Event<A>,
        target: &Arc<T>,
        method: fn(&T, &A) -> R,
    ) -> Subscription
    where
        A: 'static,
        T: Send + Sync + 'static,
        R: HandlerOutput + 'static,
    {
        let owner = OwnerId::of(target.as_ref());
        self.subscribe_callback(event, Some(owner), method_callback(target, method))
    }

    pub(crate) fn subscribe_callback<A: 'static>(
        &self,
        event: &'static Event<A>,
        owner: Option<OwnerId>,
        callback: Callback<A>,
    ) -> Subscription {
        let registry = self.registry(event);
        let handler = registry.insert(owner, callback);
        registry.token(handler)
    }

    /// Removes `owner`'s handler for `event`; no-op if there is none.
    ///
    /// Returns whether an entry was removed.
    pub fn unsubscribe<A: 'static>(&self, event: &'static Event<A>, owner: OwnerId) -> bool {
        self.lookup(event)
            .map(|registry| registry.remove(owner))
            .unwrap_or(false)
    }

    // ---------------------------
    // Emit
    // ---------------------------

    /// Emits synchronously on the calling thread; `true` iff every handler succeeded.
    pub fn emit<A: 'static>(&self, event: &'static Event<A>, args: A) -> bool {
        self.emit_report(event, args).is_success()
    }

    /// Like [`emit`](Self::emit) but returns the full [`EmitReport`].
    pub fn emit_report<A: 'static>(&self, event: &'static Event<A>, args: A) -> EmitReport {
        match self.lookup(event) {
            Some(registry) => registry.emit_report(&args),
            None => EmitReport::empty(event.name()),
        }
    }

    /// Emits with `policy`, returning after every handler completed.
    pub fn emit_concurrent<A>(
        &self,
        event: &'static Event<A>,
        args: A,
        policy: DispatchPolicy,
    ) -> bool
    where
        A: Sync + 'static,
    {
        self.emit_concurrent_report(event, args, policy).is_success()
    }

    /// Like [`emit_concurrent`](Self::emit_concurrent) but returns the full report.
    pub fn emit_concurrent_report<A>(
        &self,
        event: &'static Event<A>,
        args: A,
        policy: DispatchPolicy,
    ) -> EmitReport
    where
        A: Sync + 'static,
    {
        let policy = self.shared.config.resolve(policy);
        self.emit_with(event, args, &policy)
    }

    /// Emits through a custom [`Executor`] (join-all).
    pub fn emit_with<A, E>(
        &self,
        event: &'static Event<A>,
        args: A,
        executor: &E,
    ) -> EmitReport
    where
        A: Sync + 'static,
        E: Executor + ?Sized,
    {
        match self.lookup(event) {
            Some(registry) => registry.emit_with(&args, executor),
            None => EmitReport::empty(event.name()),
        }
    }

    /// Runs every handler on tokio's blocking pool and awaits all of them.
    #[cfg(feature = "runtime")]
    pub async fn emit_async<A>(&self, event: &'static Event<A>, args: A) -> EmitReport
    where
        A: Send + Sync + 'static,
    {
        match self.lookup(event) {
            Some(registry) => registry.emit_async(args).await,
            None => EmitReport::empty(event.name()),
        }
    }

    /// Fire-and-forget emission on the current tokio runtime.
    ///
    /// See [`DetachedEmission`] for shutdown behavior.
    ///
    /// # Errors
    /// [`DispatchError::NoRuntime`] outside a tokio runtime.
    #[cfg(feature = "runtime")]
    pub fn emit_detached<A>(
        &self,
        event: &'static Event<A>,
        args: A,
    ) -> Result<DetachedEmission, DispatchError>
    where
        A: Send + Sync + 'static,
    {
        match self.lookup(event) {
            Some(registry) => registry.emit_detached(args),
            None => DetachedEmission::none(event.name()),
        }
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Number of handlers subscribed to `event`.
    pub fn subscriber_count<A: 'static>(&self, event: &'static Event<A>) -> usize {
        self.lookup(event).map(|r| r.len()).unwrap_or(0)
    }

    /// Number of events that have a registry.
    pub fn event_count(&self) -> usize {
        self.shared.registries.read().len()
    }

    /// Returns the registry of `event`, creating it if needed.
    pub fn registry<A: 'static>(&self, event: &'static Event<A>) -> Arc<HandlerRegistry<A>> {
        if let Some(registry) = self.lookup(event) {
            return registry;
        }

        let mut registries = self.shared.registries.write();
        let slot = registries.entry(event.id()).or_insert_with(|| {
            tracing::debug!(
                publisher = %self.shared.config.label,
                event = event.name(),
                id = %event.id(),
                "registry created"
            );
            self.new_registry(event)
        });
        match Arc::clone(slot).downcast::<HandlerRegistry<A>>() {
            Ok(registry) => registry,
            // Ids are unique per `'static` declaration and a declaration fixes `A`.
            Err(_) => unreachable!("event id {} bound to two argument types", event.id()),
        }
    }

    fn new_registry<A: 'static>(&self, event: &'static Event<A>) -> ErasedRegistry {
        Arc::new(HandlerRegistry::with_config(
            event,
            Arc::clone(&self.shared.config),
        ))
    }

    fn lookup<A: 'static>(
        &self,
        event: &'static Event<A>,
    ) -> Option<Arc<HandlerRegistry<A>>> {
        let registries = self.shared.registries.read();
        let slot = registries.get(&event.id())?;
        Arc::clone(slot).downcast::<HandlerRegistry<A>>().ok()
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("label", &self.shared.config.label)
            .field("events", &self.event_count())
            .finish()
    }
}

impl WeakPublisher {
    /// Returns the publisher if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Publisher> {
        self.shared.upgrade().map(|shared| Publisher { shared })
    }

    /// Returns true if this weak handle points at `publisher`.
    pub fn is(&self, publisher: &Publisher) -> bool {
        Weak::ptr_eq(&self.shared, &Arc::downgrade(&publisher.shared))
    }
}

impl fmt::Debug for WeakPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPublisher")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Handler that calls `method` on `target` while it is alive.
pub(crate) fn method_callback<A, T, R>(target: &Arc<T>, method: fn(&T, &A) -> R) -> Callback<A>
where
    A: 'static,
    T: Send + Sync + 'static,
    R: HandlerOutput + 'static,
{
    let target = Arc::downgrade(target);
    Arc::new(move |args: &A| match target.upgrade() {
        Some(target) => method(target.as_ref(), args).into_outcome(),
        None => Ok(()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::declare_event! {
        PING: ();
        PONG: ();
        DATA: i32;
    }

    struct Counter {
        hits: AtomicUsize,
    }

    impl Counter {
        fn on_ping(&self, _: &()) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_emit_without_registry_is_true_and_lazy() {
        let publisher = Publisher::new();
        assert!(publisher.emit(&PING, ()));
        assert_eq!(publisher.event_count(), 0);
    }

    #[test]
    fn test_registries_are_per_event() {
        let publisher = Publisher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _t = publisher.subscribe(&PING, move |_: &()| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        publisher.emit(&PONG, ());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        publisher.emit(&PING, ());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.event_count(), 1);
    }

    #[test]
    fn test_registry_is_shared_across_lookups() {
        let publisher = Publisher::new();
        let a = publisher.registry(&DATA);
        let b = publisher.registry(&DATA);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_registry_lookup_keeps_existing_handlers() {
        let publisher = Publisher::new();
        let _data = publisher.subscribe(&DATA, |_: &i32| {});
        let _ping = publisher.subscribe(&PING, |_: &()| {});

        for _ in 0..3 {
            assert_eq!(publisher.registry(&DATA).len(), 1);
            assert_eq!(publisher.registry(&PING).len(), 1);
        }
        assert_eq!(publisher.event_count(), 2);
    }

    #[test]
    fn test_anonymous_token_unsubscribes() {
        let publisher = Publisher::new();
        let keep = publisher.subscribe(&PING, |_: &()| {});
        let gone = publisher.subscribe(&PING, |_: &()| {});
        assert_eq!(publisher.subscriber_count(&PING), 2);

        drop(gone);
        assert_eq!(publisher.subscriber_count(&PING), 1);
        drop(keep);
        assert_eq!(publisher.subscriber_count(&PING), 0);
    }

    #[test]
    fn test_duplicate_owner_tokens_do_not_double_remove() {
        let publisher = Publisher::new();
        let owner = OwnerId::next();
        let first = publisher.subscribe_owned(&PING, owner, |_: &()| {});
        let second = publisher.subscribe_owned(&PING, owner, |_: &()| {});
        assert_eq!(publisher.subscriber_count(&PING), 1);

        drop(first);
        assert_eq!(publisher.subscriber_count(&PING), 0);

        let third = publisher.subscribe_owned(&PING, owner, |_: &()| {});
        drop(second);
        assert_eq!(publisher.subscriber_count(&PING), 1);
        drop(third);
        assert_eq!(publisher.subscriber_count(&PING), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_owner_is_noop() {
        let publisher = Publisher::new();
        assert!(!publisher.unsubscribe(&PING, OwnerId::next()));
        assert_eq!(publisher.event_count(), 0);
    }

    #[test]
    fn test_token_outliving_publisher_is_inert() {
        let publisher = Publisher::new();
        let token = publisher.subscribe(&PING, |_: &()| {});
        drop(publisher);
        drop(token);
    }

    #[test]
    fn test_subscribe_method_and_unsubscribe_by_target() {
        let publisher = Publisher::new();
        let counter = Arc::new(Counter {
            hits: AtomicUsize::new(0),
        });
        let token = publisher.subscribe_method(&PING, &counter, Counter::on_ping);
        token.detach();

        publisher.emit(&PING, ());
        assert!(publisher.unsubscribe(&PING, OwnerId::of(counter.as_ref())));
        publisher.emit(&PING, ());
        assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_method_on_dropped_target_is_noop() {
        let publisher = Publisher::new();
        let counter = Arc::new(Counter {
            hits: AtomicUsize::new(0),
        });
        let _token = publisher.subscribe_method(&PING, &counter, Counter::on_ping);
        drop(counter);
        assert!(publisher.emit(&PING, ()));
    }

    #[test]
    fn test_handler_can_reenter_publisher() {
        let publisher = Publisher::new();
        let inner_hits = Arc::new(AtomicUsize::new(0));
        {
            let h = Arc::clone(&inner_hits);
            publisher
                .subscribe(&PONG, move |_: &()| {
                    h.fetch_add(1, Ordering::SeqCst);
                })
                .detach();
        }
        {
            let weak = publisher.downgrade();
            publisher
                .subscribe(&PING, move |_: &()| {
                    if let Some(p) = weak.upgrade() {
                        p.emit(&PONG, ());
                        p.subscribe(&PONG, |_: &()| {}).detach();
                    }
                })
                .detach();
        }

        assert!(publisher.emit(&PING, ()));
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.subscriber_count(&PONG), 2);
    }

    #[test]
    fn test_clones_share_registries() {
        let publisher = Publisher::new();
        let clone = publisher.clone();
        let _t = clone.subscribe(&DATA, |_: &i32| {});
        assert_eq!(publisher.subscriber_count(&DATA), 1);
        assert!(publisher.ptr_eq(&clone));
        assert!(publisher.downgrade().is(&clone));
    }

    #[test]
    fn test_emit_concurrent_with_no_subscribers() {
        let publisher = Publisher::new();
        assert!(publisher.emit_concurrent(&DATA, 1, DispatchPolicy::Pool { workers: 0 }));
    }
}
