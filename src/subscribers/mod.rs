//! # Subscriber side: tokens and multi-event subscribers.
//!
//! - [`Subscription`]: RAII token returned by every subscribe call;
//! - [`Subscribe`]: trait for objects that listen to several events;
//! - [`Attach`]: context used by [`Subscribe::subscribe_to`];
//! - [`Subscriber`]: owns a `Subscribe` object and detaches it on drop.
//!
//! ```text
//! Subscriber<S> ── subscribe_to(&publisher) ──► S::subscribe_to(&mut Attach)
//!                                                  ├─► attach.on(&EV_A, S::on_a)
//!                                                  └─► attach.on(&EV_B, S::on_b)
//!       │
//!       └── drop ──► S::unsubscribe_from(publisher, owner) for every attached publisher
//! ```

mod subscribe;
mod subscriber;
mod subscription;

pub use subscribe::{Attach, Subscribe};
pub use subscriber::Subscriber;
pub use subscription::Subscription;
