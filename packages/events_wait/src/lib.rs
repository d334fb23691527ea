#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Block the calling thread until a callback-driven event source raises its next event.
//!
//! Many event sources only offer a subscription model: you register a handler, get a token
//! back and unregister the handler with that token once you are no longer interested. This
//! crate turns "the next occurrence of this event on this sender" into a value you can wait
//! for with a timeout:
//!
//! * [`EventKind`] describes an event: its sender type, payload type and the sender's
//!   subscribe/unsubscribe operations.
//! * [`EventFuture`] subscribes to one event on one sender, accepts exactly one delivery and
//!   exposes the payload through blocking accessors with a fixed timeout.
//! * [`wait_event()`] does all of the above in one call and returns the payload.
//!
//! Futures are tied to the thread that created them: waiting or setting a payload from any
//! other thread fails with [`Error::WrongThread`]. The event itself must be delivered by some
//! other thread while the owner is blocked, because a waiting thread does not process
//! anything else.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! use events_wait::{EventFuture, ManualEvent};
//!
//! let sender = Arc::new(ManualEvent::<u64>::new());
//!
//! let future = EventFuture::builder()
//!     .bind(ManualEvent::kind(), &sender)
//!     .timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! let source = thread::spawn({
//!     let sender = Arc::clone(&sender);
//!     move || sender.fire(42)
//! });
//!
//! assert_eq!(*future.get().unwrap(), 42);
//! source.join().unwrap();
//! ```
//!
//! # Timeouts
//!
//! A timeout is a normal outcome. [`EventFuture::wait()`] and [`EventFuture::try_get()`]
//! report it as "no payload yet", leaving the future subscribed so the caller can wait again.
//! [`EventFuture::get()`] and [`wait_event()`] turn it into [`Error::TimedOut`].
//!
//! A future is expected to receive its payload before it is dropped. Call
//! [`EventFuture::abandon()`] to stop waiting for good.

mod affinity;
mod constants;
mod error;
mod future;
mod future_builder;
mod kind;
mod manual;
mod pump;
mod wait;

#[cfg(test)]
mod test_utils;

pub use affinity::*;
pub use constants::DEFAULT_WAIT_TIMEOUT;
pub(crate) use constants::ERR_POISONED_LOCK;
pub use error::{Error, SubscribeError};
pub(crate) use error::Result;
pub use future::EventFuture;
pub use future_builder::*;
pub use kind::*;
pub use manual::*;
pub use pump::*;
pub use wait::*;
