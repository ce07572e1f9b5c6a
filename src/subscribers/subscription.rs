//! # Subscription tokens.
//!
//! A [`Subscription`] owns the "undo" action of one subscribe call and runs it
//! exactly once: on drop, or earlier via [`Subscription::release`] /
//! [`Subscription::reset`].
//!
//! ## Rules
//! - **Move-only**: no `Clone`; moving a token moves the action, the source is gone.
//! - **At most once**: the action is taken out of the token before it runs.
//! - **Liveness**: tokens issued by a [`Publisher`](crate::Publisher) hold a weak
//!   reference to their registry; firing after the publisher was dropped is a no-op.
//! - **Precise**: the action removes the specific handler entry it was issued for,
//!   never a later subscription of the same owner.

use std::fmt;

type Undo = Box<dyn FnOnce() + Send + Sync>;

/// RAII handle that unsubscribes its handler when dropped.
#[must_use = "dropping a Subscription immediately unsubscribes the handler"]
pub struct Subscription {
    undo: Option<Undo>,
}

impl Subscription {
    /// Wraps an arbitrary undo action.
    pub fn new(undo: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            undo: Some(Box::new(undo)),
        }
    }

    /// Token with nothing to undo.
    pub fn empty() -> Self {
        Self { undo: None }
    }

    /// Returns true while the undo action has not run yet.
    pub fn is_armed(&self) -> bool {
        self.undo.is_some()
    }

    /// Unsubscribes now.
    pub fn release(mut self) {
        self.fire();
    }

    /// Unsubscribes now and leaves an empty token in place.
    pub fn reset(&mut self) {
        self.fire();
    }

    /// Disarms the token; the handler stays registered for the publisher's lifetime.
    pub fn detach(mut self) {
        self.undo = None;
    }

    fn fire(&mut self) {
        if let Some(undo) = self.undo.take() {
            undo();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting() -> (Arc<AtomicUsize>, Subscription) {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let token = Subscription::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        (fired, token)
    }

    #[test]
    fn test_drop_fires_once() {
        let (fired, token) = counting();
        drop(token);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_then_drop_fires_once() {
        let (fired, token) = counting();
        token.release();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_disarms() {
        let (fired, mut token) = counting();
        token.reset();
        assert!(!token.is_armed());
        token.reset();
        drop(token);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_moved_token_fires_from_new_home() {
        let (fired, token) = counting();
        let mut holder = Vec::new();
        holder.push(token);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        holder.clear();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_never_fires() {
        let (fired, token) = counting();
        token.detach();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_overwrite_fires_previous() {
        let (first, mut slot) = counting();
        let (second, replacement) = counting();
        slot = replacement;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        drop(slot);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_is_inert() {
        let token = Subscription::empty();
        assert!(!token.is_armed());
    }
}
