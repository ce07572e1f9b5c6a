//! # Handler registry - per-event list of subscribed callbacks.
//!
//! One [`HandlerRegistry`] holds every handler of exactly one event.
//! Entries are kept in subscription order and may carry an [`OwnerId`];
//! an owner has at most one entry per registry.
//!
//! ## Architecture
//! ```text
//! add(cb)            ──► handlers[h0] = { owner: None,    cb }
//! add_owned(o1, cb)  ──► handlers[h1] = { owner: Some(o1), cb }, owners[o1] = h1
//! add_owned(o1, cb') ──► no-op, returns h1
//!
//! emit(args)
//!   ├─► lock, clone (id, owner, cb) of every entry, unlock   (snapshot)
//!   └─► invoke each in order, catching panics and errors ──► EmitReport
//! ```
//!
//! ## Rules
//! - **Order**: handler ids grow monotonically; iteration is by id.
//! - **Dedup**: `add_owned` for an owner that already has an entry keeps the old one.
//! - **No short-circuit**: a failing handler never stops the others.
//! - **Snapshot emission**: the lock is released before any handler runs.
//!   A handler removed during an emission round is still called in that round;
//!   a handler added during a round is first called by the next emission.
//!   Handlers may subscribe, unsubscribe and emit re-entrantly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::core::config::Config;
use crate::core::handler::{callback, invoke, Callback, HandlerOutput};
use crate::core::report::{EmitReport, HandlerId};
use crate::error::HandlerError;
use crate::events::{Event, EventId, OwnerId};
use crate::policies::{DispatchPolicy, Executor, Unit};
use crate::subscribers::Subscription;

/// One subscribed handler.
struct Entry<A> {
    owner: Option<OwnerId>,
    callback: Callback<A>,
}

/// Mutable state behind the registry lock.
struct Entries<A> {
    next_id: u64,
    handlers: BTreeMap<HandlerId, Entry<A>>,
    owners: HashMap<OwnerId, HandlerId>,
}

impl<A> Entries<A> {
    fn new() -> Self {
        Self {
            next_id: 0,
            handlers: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    fn push(&mut self, owner: Option<OwnerId>, callback: Callback<A>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, Entry { owner, callback });
        if let Some(owner) = owner {
            self.owners.insert(owner, id);
        }
        id
    }
}

/// Point-in-time copy of one entry, taken for an emission round.
#[derive(Clone)]
pub(crate) struct Snapshot<A> {
    pub(crate) id: HandlerId,
    pub(crate) owner: Option<OwnerId>,
    pub(crate) callback: Callback<A>,
}

/// Thread-safe list of handlers for one event.
///
/// Usually created and owned by a [`Publisher`](crate::Publisher), but usable
/// on its own.
///
/// ### Example
/// ```rust
/// use eventline::{declare_event, HandlerRegistry, OwnerId};
///
/// declare_event! { TICK: u32; }
///
/// let registry = HandlerRegistry::new(&TICK);
/// let owner = OwnerId::next();
/// registry.add(|n: &u32| println!("tick {n}"));
/// registry.add_owned(owner, |n: &u32| -> Result<(), String> {
///     if *n > 10 { Err("too late".into()) } else { Ok(()) }
/// });
///
/// assert!(registry.emit(&1));
/// assert!(!registry.emit(&11));
///
/// assert!(registry.remove(owner));
/// assert!(registry.emit(&11));
/// ```
pub struct HandlerRegistry<A> {
    event: &'static str,
    event_id: EventId,
    config: Arc<Config>,
    entries: RwLock<Entries<A>>,
}

impl<A: 'static> HandlerRegistry<A> {
    /// Creates an empty registry for `event` with default [`Config`].
    pub fn new(event: &'static Event<A>) -> Self {
        Self::with_config(event, Arc::new(Config::default()))
    }

    pub(crate) fn with_config(event: &'static Event<A>, config: Arc<Config>) -> Self {
        Self {
            event: event.name(),
            event_id: event.id(),
            config,
            entries: RwLock::new(Entries::new()),
        }
    }

    /// Appends an anonymous handler. Always succeeds.
    ///
    /// The returned id can be passed to [`remove_handler`](Self::remove_handler).
    pub fn add<F, R>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.insert(None, callback(handler))
    }

    /// Appends a handler owned by `owner`.
    ///
    /// If `owner` already has an entry this is a no-op and the existing id is returned.
    pub fn add_owned<F, R>(&self, owner: OwnerId, handler: F) -> HandlerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.insert(Some(owner), callback(handler))
    }

    pub(crate) fn insert(&self, owner: Option<OwnerId>, callback: Callback<A>) -> HandlerId {
        let mut entries = self.entries.write();
        if let Some(existing) = owner.and_then(|o| entries.owners.get(&o).copied()) {
            tracing::trace!(event = self.event, handler = %existing, "owner already subscribed");
            return existing;
        }
        let id = entries.push(owner, callback);
        drop(entries);

        tracing::debug!(
            publisher = %self.config.label,
            event = self.event,
            handler = %id,
            owner = ?owner,
            "handler subscribed"
        );
        id
    }

    /// Removes the entry owned by `owner`. Returns `false` if there was none.
    pub fn remove(&self, owner: OwnerId) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            match entries.owners.remove(&owner) {
                Some(id) => entries.handlers.remove(&id).is_some(),
                None => false,
            }
        };
        if removed {
            tracing::debug!(event = self.event, owner = %owner, "owner unsubscribed");
        }
        removed
    }

    /// Removes one entry by id. Returns `false` if it is already gone.
    pub fn remove_handler(&self, handler: HandlerId) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            match entries.handlers.remove(&handler) {
                Some(entry) => {
                    if let Some(owner) = entry.owner {
                        entries.owners.remove(&owner);
                    }
                    true
                }
                None => false,
            }
        };
        if removed {
            tracing::debug!(event = self.event, handler = %handler, "handler unsubscribed");
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.handlers.clear();
        entries.owners.clear();
    }

    /// Returns true if `owner` has an entry.
    pub fn contains(&self, owner: OwnerId) -> bool {
        self.entries.read().owners.contains_key(&owner)
    }

    /// Returns true if the entry `handler` is still registered.
    pub fn contains_handler(&self, handler: HandlerId) -> bool {
        self.entries.read().handlers.contains_key(&handler)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.read().handlers.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().handlers.is_empty()
    }

    /// Name of the event this registry serves.
    pub fn event_name(&self) -> &'static str {
        self.event
    }

    /// Id of the event this registry serves.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Emits synchronously; `true` iff every handler succeeded.
    pub fn emit(&self, args: &A) -> bool {
        self.emit_report(args).is_success()
    }

    /// Invokes every handler in subscription order on the calling thread.
    ///
    /// Failures (error returns and panics) are collected; remaining handlers
    /// still run.
    pub fn emit_report(&self, args: &A) -> EmitReport {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return EmitReport::empty(self.event);
        }
        let report = EmitReport::collect(
            self.event,
            snapshot
                .iter()
                .map(|entry| (entry.id, entry.owner, invoke(&entry.callback, args))),
        );
        self.finish("sync", report)
    }

    /// Emits with `policy`; `true` iff every handler succeeded.
    ///
    /// Returns only after every handler has completed.
    pub fn emit_concurrent(&self, args: &A, policy: DispatchPolicy) -> bool
    where
        A: Sync,
    {
        self.emit_with(args, &self.config.resolve(policy)).is_success()
    }

    /// Dispatches one unit per handler to `executor` and joins them all.
    ///
    /// Completion order is up to the executor; the report lists failures in
    /// subscription order regardless.
    pub fn emit_with<E>(&self, args: &A, executor: &E) -> EmitReport
    where
        A: Sync,
        E: Executor + ?Sized,
    {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return EmitReport::empty(self.event);
        }

        let slots: Vec<OnceLock<Result<(), HandlerError>>> =
            snapshot.iter().map(|_| OnceLock::new()).collect();
        let units: Vec<Unit<'_>> = snapshot
            .iter()
            .zip(&slots)
            .map(|(entry, slot)| {
                Box::new(move || {
                    let _ = slot.set(invoke(&entry.callback, args));
                }) as Unit<'_>
            })
            .collect();
        executor.execute(units);

        let report = EmitReport::collect(
            self.event,
            snapshot.iter().zip(slots).map(|(entry, slot)| {
                let outcome = slot.into_inner().unwrap_or(Err(HandlerError::NotRun));
                (entry.id, entry.owner, outcome)
            }),
        );
        self.finish("concurrent", report)
    }

    /// Copies the current entries so handlers run without the lock held.
    pub(crate) fn snapshot(&self) -> Vec<Snapshot<A>> {
        self.entries
            .read()
            .handlers
            .iter()
            .map(|(id, entry)| Snapshot {
                id: *id,
                owner: entry.owner,
                callback: Arc::clone(&entry.callback),
            })
            .collect()
    }

    /// Logs the outcome of an emission and hands the report back.
    pub(crate) fn finish(&self, mode: &'static str, report: EmitReport) -> EmitReport {
        tracing::trace!(
            publisher = %self.config.label,
            event = self.event,
            mode,
            invoked = report.invoked,
            failed = report.failures.len(),
            "event emitted"
        );
        if self.config.log_failures {
            for failure in &report.failures {
                tracing::warn!(
                    publisher = %self.config.label,
                    event = self.event,
                    handler = %failure.handler,
                    owner = ?failure.owner,
                    reason = failure.error.as_label(),
                    error = %failure.error,
                    "handler failed"
                );
            }
        }
        report
    }

    /// Token that removes `handler` from this registry when dropped.
    ///
    /// Holds only a weak reference: once the registry is gone the token is inert.
    pub(crate) fn token(self: &Arc<Self>, handler: HandlerId) -> Subscription {
        let registry = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove_handler(handler);
            }
        })
    }
}

impl<A> fmt::Debug for HandlerRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event", &self.event)
            .field("event_id", &self.event_id)
            .field("handlers", &self.entries.read().handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::declare_event! {
        PING: ();
        DATA: i32;
    }

    fn explode(_: &i32) {
        panic!("boom");
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let registry = HandlerRegistry::new(&PING);
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            registry.add(move |_: &()| log.lock().push(name));
        }

        assert!(registry.emit(&()));
        assert!(registry.emit(&()));
        assert_eq!(*log.lock(), vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_empty_registry_emits_true() {
        let registry = HandlerRegistry::new(&DATA);
        let report = registry.emit_report(&1);
        assert!(report.is_success());
        assert_eq!(report.invoked, 0);
        assert!(registry.emit_concurrent(&1, DispatchPolicy::ThreadPerHandler));
    }

    #[test]
    fn test_add_owned_is_idempotent() {
        let registry = HandlerRegistry::new(&DATA);
        let owner = OwnerId::next();
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = {
            let hits = Arc::clone(&hits);
            registry.add_owned(owner, move |_: &i32| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let h2 = registry.add_owned(owner, explode);

        assert_eq!(h1, h2);
        assert_eq!(registry.len(), 1);
        assert!(registry.emit(&0));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_unknown_owner_is_noop() {
        let registry = HandlerRegistry::new(&PING);
        registry.add(|_: &()| {});
        assert!(!registry.remove(OwnerId::next()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_handler_clears_owner_index() {
        let registry = HandlerRegistry::new(&PING);
        let owner = OwnerId::next();
        let id = registry.add_owned(owner, |_: &()| {});

        assert!(registry.remove_handler(id));
        assert!(!registry.contains(owner));
        assert!(!registry.remove_handler(id));

        let again = registry.add_owned(owner, |_: &()| {});
        assert_ne!(again, id);
        assert!(registry.contains_handler(again));
    }

    #[test]
    fn test_anonymous_handlers_removable_by_id() {
        let registry = HandlerRegistry::new(&PING);
        let first = registry.add(|_: &()| {});
        let second = registry.add(|_: &()| {});

        assert!(registry.remove_handler(first));
        assert!(!registry.contains_handler(first));
        assert!(registry.contains_handler(second));
    }

    #[test]
    fn test_failure_does_not_short_circuit() {
        let registry = HandlerRegistry::new(&DATA);
        let seen = Arc::new(AtomicUsize::new(0));

        registry.add(|_: &i32| -> Result<(), &'static str> { Err("nope") });
        registry.add(explode);
        {
            let seen = Arc::clone(&seen);
            registry.add(move |v: &i32| {
                seen.fetch_add(*v as usize, Ordering::SeqCst);
            });
        }

        let report = registry.emit_report(&5);
        assert!(!report.is_success());
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].error.as_label(), "handler_failed");
        assert_eq!(report.failures[1].error.as_label(), "handler_panicked");
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_concurrent_joins_all_handlers() {
        let registry = HandlerRegistry::new(&DATA);
        let sum = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let sum = Arc::clone(&sum);
            registry.add(move |v: &i32| {
                std::thread::sleep(std::time::Duration::from_millis(2));
                sum.fetch_add(*v as usize, Ordering::SeqCst);
            });
        }

        for policy in [
            DispatchPolicy::Sequential,
            DispatchPolicy::ThreadPerHandler,
            DispatchPolicy::Pool { workers: 4 },
            DispatchPolicy::Pool { workers: 0 },
        ] {
            sum.store(0, Ordering::SeqCst);
            assert!(registry.emit_concurrent(&2, policy));
            assert_eq!(sum.load(Ordering::SeqCst), 32, "policy {policy:?}");
        }
    }

    #[test]
    fn test_concurrent_aggregates_failures() {
        let registry = HandlerRegistry::new(&DATA);
        let ok = Arc::new(AtomicUsize::new(0));
        registry.add(explode);
        {
            let ok = Arc::clone(&ok);
            registry.add(move |_: &i32| {
                ok.fetch_add(1, Ordering::SeqCst);
            });
        }

        let report = registry.emit_with(&1, &DispatchPolicy::ThreadPerHandler);
        assert_eq!(report.invoked, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].handler, HandlerId(0));
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_executor_that_drops_units_reports_not_run() {
        struct Lazy;
        impl Executor for Lazy {
            fn execute<'scope>(&self, units: Vec<Unit<'scope>>) {
                drop(units);
            }
        }

        let registry = HandlerRegistry::new(&PING);
        registry.add(|_: &()| {});
        let report = registry.emit_with(&(), &Lazy);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error, HandlerError::NotRun);
    }

    #[test]
    fn test_handler_removed_during_emit_still_runs_this_round() {
        let registry = Arc::new(HandlerRegistry::new(&PING));
        let hits = Arc::new(AtomicUsize::new(0));
        let victim = OwnerId::next();

        {
            let registry_ref = Arc::downgrade(&registry);
            registry.add(move |_: &()| {
                if let Some(r) = registry_ref.upgrade() {
                    r.remove(victim);
                }
            });
        }
        {
            let hits = Arc::clone(&hits);
            registry.add_owned(victim, move |_: &()| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(registry.emit(&()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.emit(&()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_added_during_emit_runs_next_round() {
        let registry = Arc::new(HandlerRegistry::new(&PING));
        let hits = Arc::new(AtomicUsize::new(0));
        let adder = OwnerId::next();

        {
            let registry_ref = Arc::downgrade(&registry);
            let hits = Arc::clone(&hits);
            registry.add(move |_: &()| {
                if let Some(r) = registry_ref.upgrade() {
                    let hits = Arc::clone(&hits);
                    r.add_owned(adder, move |_: &()| {
                        hits.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }

        registry.emit(&());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        registry.emit(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_token_is_inert_after_registry_drop() {
        let registry = Arc::new(HandlerRegistry::new(&PING));
        let id = registry.add(|_: &()| {});
        let token = registry.token(id);
        drop(registry);
        drop(token);
    }
}
