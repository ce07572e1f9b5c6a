//! # Owner identity.
//!
//! An [`OwnerId`] tags a subscription with "who" made it. A registry keeps at
//! most one entry per owner and can remove an entry by owner.
//!
//! Two ways to get one:
//! - [`OwnerId::next`] allocates a fresh id that is never reused;
//! - [`OwnerId::of`] uses a value's address. Addresses are reused after the
//!   value is freed, so unsubscribe before dropping the value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Counter for [`OwnerId::next`]; lives in the upper half of the range,
/// above user-space addresses on 64-bit targets.
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1 << 63);

/// Opaque, comparable identity of a subscription owner.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocates a process-unique owner id.
    pub fn next() -> Self {
        OwnerId(NEXT_OWNER.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Identity derived from the address of `value`.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        OwnerId((value as *const T).cast::<()>() as usize as u64)
    }

    /// Builds an id from a caller-chosen number.
    pub const fn from_raw(raw: u64) -> Self {
        OwnerId(raw)
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({:#x})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
