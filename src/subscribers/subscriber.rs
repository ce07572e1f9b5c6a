//! # Subscriber - lifetime-aware wrapper around a [`Subscribe`] object.
//!
//! [`Subscriber`] remembers every publisher it attached to and every token it
//! received, and detaches from all of them when dropped.
//!
//! ## Architecture
//! ```text
//! Subscriber<S>
//!   ├─► inner: Arc<S>              (handlers capture Weak<S>)
//!   ├─► owner: OwnerId             (fresh per subscriber)
//!   └─► attached: Vec<Attached>
//!          └─► { publisher: WeakPublisher, tokens: Vec<Subscription> }
//!
//! unsubscribe_from(p) ──► S::unsubscribe_from(p, owner), drop p's tokens
//!
//! drop ──► unsubscribe_from_all()
//!            ├─► S::unsubscribe_from(publisher, owner)  for each live publisher
//!            └─► attached.clear()   (drops every token; removed entries: no-op)
//! ```
//!
//! ## Rules
//! - Detachment on drop is done here, not by `S`.
//! - Tokens are kept per publisher and released together with it, so a
//!   handler `S::unsubscribe_from` misses is still removed.
//! - Publishers are held weakly; a publisher dropped first is skipped.
//! - `unsubscribe_from_all` is idempotent.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::core::{Publisher, WeakPublisher};
use crate::events::OwnerId;
use crate::subscribers::{Attach, Subscribe, Subscription};

/// One attached publisher and the tokens issued by it.
struct Attached {
    publisher: WeakPublisher,
    tokens: Vec<Subscription>,
}

/// Owns a [`Subscribe`] object and its subscriptions.
pub struct Subscriber<S: Subscribe> {
    inner: Arc<S>,
    owner: OwnerId,
    attached: Vec<Attached>,
}

impl<S: Subscribe> Subscriber<S> {
    /// Wraps `inner` with a fresh owner id.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            owner: OwnerId::next(),
            attached: Vec::new(),
        }
    }

    /// Runs `S::subscribe_to` against `publisher` and records the attachment.
    ///
    /// Attaching twice to the same publisher keeps one registration per event.
    pub fn subscribe_to(&mut self, publisher: &Publisher) {
        let idx = match self.position(publisher) {
            Some(idx) => idx,
            None => {
                self.attached.push(Attached {
                    publisher: publisher.downgrade(),
                    tokens: Vec::new(),
                });
                self.attached.len() - 1
            }
        };
        let tokens = &mut self.attached[idx].tokens;
        let before = tokens.len();
        let mut attach = Attach::new(publisher, &self.inner, self.owner, tokens);
        self.inner.subscribe_to(&mut attach);

        tracing::debug!(
            subscriber = self.inner.name(),
            owner = %self.owner,
            publisher = %publisher.config().label,
            tokens = self.attached[idx].tokens.len() - before,
            "subscriber attached"
        );
    }

    /// Runs `S::unsubscribe_from` against `publisher`, then drops its tokens.
    pub fn unsubscribe_from(&mut self, publisher: &Publisher) {
        self.inner.unsubscribe_from(publisher, self.owner);
        if let Some(idx) = self.position(publisher) {
            self.attached.remove(idx);
        }
        tracing::debug!(
            subscriber = self.inner.name(),
            owner = %self.owner,
            publisher = %publisher.config().label,
            "subscriber detached"
        );
    }

    /// Detaches from every attached publisher and drops every token.
    pub fn unsubscribe_from_all(&mut self) {
        if self.attached.is_empty() {
            return;
        }
        for attached in self.attached.drain(..) {
            if let Some(publisher) = attached.publisher.upgrade() {
                self.inner.unsubscribe_from(&publisher, self.owner);
            }
        }
        tracing::debug!(
            subscriber = self.inner.name(),
            owner = %self.owner,
            "subscriber detached from all publishers"
        );
    }

    /// Returns true if `publisher` is in the attached set.
    pub fn is_attached(&self, publisher: &Publisher) -> bool {
        self.position(publisher).is_some()
    }

    /// Number of attached publishers.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Number of held tokens across all attached publishers.
    pub fn token_count(&self) -> usize {
        self.attached.iter().map(|a| a.tokens.len()).sum()
    }

    /// Owner id used for every subscription of this subscriber.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Shared handle to the wrapped object.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn position(&self, publisher: &Publisher) -> Option<usize> {
        self.attached.iter().position(|a| a.publisher.is(publisher))
    }
}

impl<S: Subscribe> Deref for Subscriber<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Subscribe> Drop for Subscriber<S> {
    fn drop(&mut self) {
        self.unsubscribe_from_all();
    }
}

impl<S: Subscribe> fmt::Debug for Subscriber<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.inner.name())
            .field("owner", &self.owner)
            .field("publishers", &self.attached.len())
            .field("tokens", &self.token_count())
            .finish()
    }
}
