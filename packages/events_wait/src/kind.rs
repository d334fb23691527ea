use std::fmt;
use std::sync::Arc;

use crate::SubscribeError;

/// A handler registered with an event source.
///
/// The event source calls it with the sender that raised the event and the event payload.
/// Each registered handler is called at most once by a well-behaved source, though the
/// handlers created by this crate tolerate repeated calls.
pub type Handler<S, P> = Arc<dyn Fn(&S, P) -> HandlerStatus + Send + Sync>;

/// Opaque handle returned by an event source when a handler is registered, required to
/// unregister that handler later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

impl RegistrationToken {
    /// Creates a token from a value chosen by the event source.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The value the event source created the token from.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// What a [`Handler`] did with a delivered event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandlerStatus {
    /// The payload was accepted and the handler has unregistered itself.
    Handled,

    /// The handler had already completed, or its future no longer exists; the event was ignored.
    Stale,

    /// The event was raised by a different sender than the one the handler was registered
    /// with. The event was ignored and the handler remains registered.
    SenderMismatch,

    /// The event kind requires delivery on the owning thread but arrived on another one.
    /// The event was ignored and the handler remains registered.
    WrongThread,
}

/// Which threads an event source may deliver events of a given kind on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Delivery {
    /// Events may arrive on any thread. This is the only policy under which a blocked
    /// owner can be woken up, because its own thread is busy waiting.
    #[default]
    AnyThread,

    /// Events must arrive on the thread that created the waiting future. Deliveries from
    /// other threads are rejected with [`HandlerStatus::WrongThread`].
    OwnerThread,
}

/// Describes one kind of event: which sender type raises it, how to subscribe to and
/// unsubscribe from it and what payload it carries.
///
/// Event kinds are plain values, typically defined once as a `const` next to the sender type.
///
/// # Example
///
/// ```rust
/// use events_wait::{EventKind, Handler, RegistrationToken, SubscribeError};
///
/// struct Browser;
///
/// impl Browser {
///     fn add_navigation_completed(
///         &self,
///         _handler: Handler<Browser, String>,
///     ) -> Result<RegistrationToken, SubscribeError> {
///         # Ok(RegistrationToken::new(1))
///         // Register the handler, return a token identifying it.
///     }
///
///     fn remove_navigation_completed(&self, _token: RegistrationToken) -> bool {
///         # true
///         // Unregister the handler, return whether it was registered.
///     }
/// }
///
/// const NAVIGATION_COMPLETED: EventKind<Browser, String> = EventKind::new(
///     "navigation_completed",
///     Browser::add_navigation_completed,
///     Browser::remove_navigation_completed,
/// );
/// ```
pub struct EventKind<S, P> {
    name: &'static str,
    subscribe: fn(&S, Handler<S, P>) -> Result<RegistrationToken, SubscribeError>,
    unsubscribe: fn(&S, RegistrationToken) -> bool,
    delivery: Delivery,
}

impl<S, P> EventKind<S, P> {
    /// Describes an event kind from its name and its subscribe/unsubscribe operations.
    ///
    /// The name is only used for diagnostics.
    #[must_use]
    pub const fn new(
        name: &'static str,
        subscribe: fn(&S, Handler<S, P>) -> Result<RegistrationToken, SubscribeError>,
        unsubscribe: fn(&S, RegistrationToken) -> bool,
    ) -> Self {
        Self {
            name,
            subscribe,
            unsubscribe,
            delivery: Delivery::AnyThread,
        }
    }

    /// Sets which threads the event source may deliver events of this kind on.
    ///
    /// The default is [`Delivery::AnyThread`].
    #[must_use]
    pub const fn with_delivery(self, delivery: Delivery) -> Self {
        let mut this = self;
        this.delivery = delivery;
        this
    }

    /// The name of the event kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Which threads events of this kind may be delivered on.
    #[must_use]
    pub const fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub(crate) fn subscribe(
        &self,
        sender: &S,
        handler: Handler<S, P>,
    ) -> Result<RegistrationToken, SubscribeError> {
        (self.subscribe)(sender, handler)
    }

    pub(crate) fn unsubscribe(&self, sender: &S, token: RegistrationToken) -> bool {
        (self.unsubscribe)(sender, token)
    }
}

// Derives would require `S` and `P` to implement these traits, which they do not need to.
impl<S, P> Clone for EventKind<S, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, P> Copy for EventKind<S, P> {}

impl<S, P> fmt::Debug for EventKind<S, P> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventKind")
            .field("name", &self.name)
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}
