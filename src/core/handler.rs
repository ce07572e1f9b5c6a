//! # Handler callables.
//!
//! Handlers are stored type-erased as [`Callback<A>`]. Any `Fn(&A) -> R`
//! whose `R` implements [`HandlerOutput`] can be subscribed: `()` always
//! succeeds, `Result<(), E>` fails with `E`'s message.
//!
//! ## Panic handling
//! [`invoke`] wraps every call in `catch_unwind` and turns a panic into
//! [`HandlerError::Panicked`], so a panicking handler never aborts the
//! emission it is part of.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state
//! inconsistent if a handler panics while holding a lock.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::HandlerError;

/// Type-erased handler for events with argument type `A`.
pub(crate) type Callback<A> = Arc<dyn Fn(&A) -> Result<(), HandlerError> + Send + Sync>;

/// Return types accepted from handlers.
pub trait HandlerOutput {
    /// Converts the handler's return value into an outcome.
    fn into_outcome(self) -> Result<(), HandlerError>;
}

impl HandlerOutput for () {
    #[inline]
    fn into_outcome(self) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl<E: Display> HandlerOutput for Result<(), E> {
    #[inline]
    fn into_outcome(self) -> Result<(), HandlerError> {
        self.map_err(HandlerError::failed)
    }
}

/// Erases a concrete handler into a [`Callback`].
pub(crate) fn callback<A, F, R>(handler: F) -> Callback<A>
where
    A: 'static,
    F: Fn(&A) -> R + Send + Sync + 'static,
    R: HandlerOutput,
{
    Arc::new(move |args: &A| handler(args).into_outcome())
}

/// Calls `cb`, converting a panic into [`HandlerError::Panicked`].
pub(crate) fn invoke<A>(cb: &Callback<A>, args: &A) -> Result<(), HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| cb(args))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(HandlerError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_return_is_success() {
        let cb = callback(|_: &i32| {});
        assert_eq!(invoke(&cb, &1), Ok(()));
    }

    #[test]
    fn test_error_return_is_failure() {
        let cb = callback(|v: &i32| -> Result<(), String> {
            if *v < 0 {
                Err(format!("negative: {v}"))
            } else {
                Ok(())
            }
        });
        assert_eq!(invoke(&cb, &3), Ok(()));
        assert_eq!(
            invoke(&cb, &-2),
            Err(HandlerError::Failed {
                message: "negative: -2".into()
            })
        );
    }

    #[test]
    fn test_panic_is_caught() {
        let cb = callback(|v: &i32| {
            if *v == 0 {
                panic!("zero");
            }
        });
        assert_eq!(
            invoke(&cb, &0),
            Err(HandlerError::Panicked {
                message: "zero".into()
            })
        );

        let cb = callback(|v: &i32| {
            if *v > 0 {
                panic!("formatted {v}");
            }
        });
        assert_eq!(
            invoke(&cb, &9),
            Err(HandlerError::Panicked {
                message: "formatted 9".into()
            })
        );
    }
}
