use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    ERR_POISONED_LOCK, EventKind, Handler, HandlerStatus, RegistrationToken, SubscribeError,
};

/// An event source that raises its event whenever [`fire()`][Self::fire] is called.
///
/// This connects code that produces values through plain function calls (or tests that
/// simulate an external event source) to [`EventFuture`][crate::EventFuture]. It can be
/// fired from any thread.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use events_wait::{EventFuture, ManualEvent};
///
/// let sender = Arc::new(ManualEvent::<u32>::new());
/// let future = EventFuture::new(ManualEvent::kind(), &sender).unwrap();
///
/// assert_eq!(sender.fire(5), 1);
/// assert_eq!(future.try_get().unwrap(), Some(&5));
/// ```
pub struct ManualEvent<P> {
    handlers: Mutex<Vec<(RegistrationToken, Handler<Self, P>)>>,
    next_token: AtomicU64,
    unsubscribe_calls: AtomicUsize,

    // If set, subscribing fails with this reason.
    rejection: Mutex<Option<String>>,
}

impl<P> ManualEvent<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates an event source with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
            unsubscribe_calls: AtomicUsize::new(0),
            rejection: Mutex::new(None),
        }
    }

    /// The event kind describing this source, for use with
    /// [`EventFuture`][crate::EventFuture] and [`wait_event()`][crate::wait_event].
    #[must_use]
    pub fn kind() -> EventKind<Self, P> {
        EventKind::new("manual", Self::subscribe, Self::unsubscribe)
    }

    /// Registers a handler to be called by every subsequent [`fire()`][Self::fire] until it
    /// is unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if [`reject_subscriptions()`][Self::reject_subscriptions] was called.
    pub fn subscribe(
        &self,
        handler: Handler<Self, P>,
    ) -> Result<RegistrationToken, SubscribeError> {
        if let Some(reason) = &*self.rejection.lock().expect(ERR_POISONED_LOCK) {
            return Err(SubscribeError::new(reason.clone()));
        }

        let token = RegistrationToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));

        self.handlers
            .lock()
            .expect(ERR_POISONED_LOCK)
            .push((token, handler));

        Ok(token)
    }

    /// Unregisters the handler identified by `token`.
    ///
    /// Returns `false` if no such handler is registered, for example because it was already
    /// unsubscribed.
    pub fn unsubscribe(&self, token: RegistrationToken) -> bool {
        self.unsubscribe_calls.fetch_add(1, Ordering::Relaxed);

        let mut handlers = self.handlers.lock().expect(ERR_POISONED_LOCK);
        let count_before = handlers.len();
        handlers.retain(|(registered, _)| *registered != token);

        handlers.len() != count_before
    }

    /// Raises the event, calling every registered handler with a clone of `payload`.
    ///
    /// Handlers are called outside of any lock, so they may unsubscribe themselves.
    ///
    /// Returns how many handlers reported [`HandlerStatus::Handled`].
    pub fn fire(&self, payload: P) -> usize {
        self.fire_as(self, payload)
    }

    /// Calls every handler registered with this source but reports `observed` as the sender.
    ///
    /// This simulates an event source that delivers events from the wrong object.
    ///
    /// Returns how many handlers reported [`HandlerStatus::Handled`].
    pub fn fire_as(&self, observed: &Self, payload: P) -> usize {
        self.handlers()
            .into_iter()
            .map(|handler| handler(observed, payload.clone()))
            .filter(|status| *status == HandlerStatus::Handled)
            .count()
    }

    /// Makes every subsequent [`subscribe()`][Self::subscribe] fail with `reason`.
    pub fn reject_subscriptions(&self, reason: impl Into<String>) {
        *self.rejection.lock().expect(ERR_POISONED_LOCK) = Some(reason.into());
    }

    /// How many handlers are currently registered.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().expect(ERR_POISONED_LOCK).len()
    }

    /// How many times [`unsubscribe()`][Self::unsubscribe] has been called, whether or not
    /// the token was registered.
    #[must_use]
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::Relaxed)
    }

    // Snapshot, so handlers can run without holding the lock.
    pub(crate) fn handlers(&self) -> Vec<Handler<Self, P>> {
        self.handlers
            .lock()
            .expect(ERR_POISONED_LOCK)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

impl<P> Default for ManualEvent<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ManualEvent<P> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualEvent")
            .field(
                "subscriber_count",
                &self.handlers.lock().map_or(0, |handlers| handlers.len()),
            )
            .field("unsubscribe_calls", &self.unsubscribe_calls)
            .finish_non_exhaustive()
    }
}
