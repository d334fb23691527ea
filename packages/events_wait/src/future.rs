//! Single-shot futures that block until the next occurrence of an event.
//!
//! An [`EventFuture`] subscribes a handler to one event on one sender when it is created.
//! The first delivery unsubscribes the handler and stores the payload; the owning thread
//! picks the payload up through the blocking accessors.

use std::any::type_name;
use std::fmt;
use std::ptr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::{
    AffinityGuard, DEFAULT_WAIT_TIMEOUT, Delivery, ERR_POISONED_LOCK, Error, EventFutureBuilder,
    EventKind, Handler, HandlerStatus, RegistrationToken, Result, WaitPump,
};

pub(crate) type Callback<P> = Box<dyn Fn(&P) + Send + Sync>;

// Name used in diagnostics for futures that are not bound to any event source.
const UNBOUND_EVENT_NAME: &str = "<unbound>";

/// Waits for the next occurrence of an event raised by a specific sender.
///
/// Creating the future registers a handler with the sender. The handler accepts the first
/// delivery, unregisters itself and stores the payload, after which the payload stays
/// available for the lifetime of the future.
///
/// The blocking accessors ([`wait()`][Self::wait], [`try_get()`][Self::try_get] and
/// [`get()`][Self::get]) and [`set()`][Self::set] may only be used on the thread that
/// created the future and return [`Error::WrongThread`] elsewhere. Each wait blocks for at
/// most the timeout the future was built with ([`DEFAULT_WAIT_TIMEOUT`] by default). The
/// event must be delivered by some other thread while the owner is blocked.
///
/// A future is expected to receive its payload before it is dropped. Dropping a future that
/// never received one is reported as an error and panics in debug builds; use
/// [`abandon()`][Self::abandon] to give up on a future explicitly.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
///
/// use events_wait::{EventFuture, ManualEvent};
///
/// let sender = Arc::new(ManualEvent::<String>::new());
/// let future = EventFuture::new(ManualEvent::kind(), &sender).unwrap();
///
/// let source = thread::spawn({
///     let sender = Arc::clone(&sender);
///     move || sender.fire("done".to_string())
/// });
///
/// assert_eq!(future.get().unwrap(), "done");
/// source.join().unwrap();
/// ```
pub struct EventFuture<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    shared: Arc<Shared<S, P>>,
    timeout: Duration,
    abandoned: bool,
}

impl<S, P> EventFuture<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Starts building a future with custom options.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// use events_wait::{EventFuture, ManualEvent, WaitPump};
    ///
    /// let sender = Arc::new(ManualEvent::<u32>::new());
    ///
    /// let future = EventFuture::builder()
    ///     .bind(ManualEvent::kind(), &sender)
    ///     .callback(|value: &u32| println!("received {value}"))
    ///     .timeout(Duration::from_secs(5))
    ///     .pump(WaitPump::global())
    ///     .build()
    ///     .unwrap();
    ///
    /// sender.fire(7);
    /// assert_eq!(*future.get().unwrap(), 7);
    /// ```
    #[must_use]
    pub fn builder() -> EventFutureBuilder<S, P> {
        EventFutureBuilder::new()
    }

    /// Subscribes to the next occurrence of `kind` on `sender`, using default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subscribe`] if the sender refuses to register the handler.
    pub fn new(kind: EventKind<S, P>, sender: &Arc<S>) -> Result<Self> {
        Self::builder().bind(kind, sender).build()
    }

    /// Creates a future that is not bound to any event source and can only be fulfilled
    /// via [`set()`][Self::set].
    #[must_use]
    pub fn manual() -> Self {
        Self::from_shared(
            Arc::new(Shared::new(None, None, Arc::new(WaitPump::new()))),
            DEFAULT_WAIT_TIMEOUT,
        )
    }

    pub(crate) fn from_builder(builder: EventFutureBuilder<S, P>) -> Result<Self> {
        let pump = builder.pump.unwrap_or_default();

        let binding = builder
            .binding
            .map(|(kind, sender)| Binding { kind, sender });

        let shared = Arc::new(Shared::new(binding, builder.callback, pump));
        Shared::subscribe(&shared)?;

        Ok(Self::from_shared(shared, builder.timeout))
    }

    fn from_shared(shared: Arc<Shared<S, P>>, timeout: Duration) -> Self {
        Self {
            shared,
            timeout,
            abandoned: false,
        }
    }

    /// Blocks until the payload is available or the timeout elapses.
    ///
    /// Returns immediately if the payload is already available. Returns `Ok(true)` if the
    /// payload is available and `Ok(false)` if the wait timed out without the event
    /// occurring, in which case the future remains subscribed and can be waited on again.
    ///
    /// Releases of the pump that do not make this future's payload available, such as another
    /// future sharing the pump being fulfilled, do not end the wait early.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`] if called on a thread other than the one that created
    /// the future.
    ///
    /// # Panics
    ///
    /// Panics if a wait on this future is already in progress.
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub fn wait(&self) -> Result<bool> {
        self.shared.affinity.check("EventFuture::wait")?;

        let already_suspended = {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

            if state.suspended {
                true
            } else if self.is_ready() {
                return Ok(true);
            } else {
                // Once this is visible, the handler knows to release the pump after delivery.
                state.suspended = true;
                false
            }
        };

        assert!(
            !already_suspended,
            "EventFuture::wait cannot be called when it is already waiting"
        );

        let shared = &self.shared;
        let started = Instant::now();

        loop {
            let remaining = self.timeout.saturating_sub(started.elapsed());

            if remaining.is_zero() {
                break;
            }

            // Returns early if anyone releases the pump, which may be for another future.
            shared
                .pump
                .suspend_until(remaining, || shared.payload.get().is_some());

            if self.is_ready() {
                break;
            }
        }

        shared.state.lock().expect(ERR_POISONED_LOCK).suspended = false;

        Ok(self.is_ready())
    }

    /// Waits for the payload and returns a reference to it, or [`None`] if the wait timed out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`] if called on a thread other than the one that created
    /// the future.
    ///
    /// # Panics
    ///
    /// Panics if a wait on this future is already in progress.
    pub fn try_get(&self) -> Result<Option<&P>> {
        if self.wait()? {
            Ok(self.shared.payload.get())
        } else {
            Ok(None)
        }
    }

    /// Waits for the payload and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimedOut`] if the wait timed out, after logging a
    /// diagnostic naming the expected payload type.
    ///
    /// Returns [`Error::WrongThread`] if called on a thread other than the one that created
    /// the future.
    ///
    /// # Panics
    ///
    /// Panics if a wait on this future is already in progress.
    pub fn get(&self) -> Result<&P> {
        self.try_get()?.ok_or_else(|| {
            let payload = type_name::<P>();

            warn!(
                event = self.shared.event_name(),
                payload,
                timeout = ?self.timeout,
                "timed out waiting for a result"
            );

            Error::TimedOut {
                payload,
                timeout: self.timeout,
            }
        })
    }

    /// Whether the payload is available. Never blocks.
    ///
    /// Unlike the other operations, this may be called from any thread.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared.payload.get().is_some()
    }

    /// Provides the payload directly, bypassing the event source.
    ///
    /// Any thread blocked in [`wait()`][Self::wait] is released. The user callback is not
    /// invoked; it only observes payloads delivered by the event source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`] if called on a thread other than the one that created
    /// the future.
    ///
    /// # Panics
    ///
    /// Panics if the payload has already been set, either by an earlier call or by the
    /// event source.
    pub fn set(&self, payload: P) -> Result<()> {
        self.shared.affinity.check("EventFuture::set")?;

        let accepted = self.shared.store(payload);
        assert!(accepted, "EventFuture::set can only be called once");

        self.shared.wake_owner();

        Ok(())
    }

    /// The sender this future is subscribed to, or [`None`] for a future that is not bound
    /// to any event source.
    #[must_use]
    pub fn sender(&self) -> Option<&Arc<S>> {
        self.shared.binding.as_ref().map(|binding| &binding.sender)
    }

    /// The timeout applied to each wait.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drops the future without requiring its payload to have been set.
    ///
    /// Use this after a wait timed out and the caller decided to stop waiting for the event.
    /// The handler is unregistered from the sender as usual.
    pub fn abandon(mut self) {
        self.abandoned = true;
    }
}

impl<S, P> Drop for EventFuture<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(binding) = &self.shared.binding {
            // The handler normally unregistered itself already; this covers the event never
            // having arrived. Unsubscribing twice is harmless.
            let token = self
                .shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .token;

            if let Some(token) = token {
                binding.unsubscribe(token);
            }
        }

        let unfulfilled = !self.abandoned && !self.is_ready() && !thread::panicking();

        if unfulfilled {
            error!(
                event = self.shared.event_name(),
                payload = type_name::<P>(),
                "EventFuture was dropped without its result ever having been set"
            );
        }

        debug_assert!(
            !unfulfilled,
            "EventFuture was dropped without its result ever having been set"
        );
    }
}

impl<S, P> fmt::Debug for EventFuture<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFuture")
            .field("event", &self.shared.event_name())
            .field("is_ready", &self.is_ready())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct Binding<S, P> {
    kind: EventKind<S, P>,
    sender: Arc<S>,
}

impl<S, P> Binding<S, P> {
    fn unsubscribe(&self, token: RegistrationToken) {
        if self.kind.unsubscribe(&self.sender, token) {
            debug!(
                event = self.kind.name(),
                token = token.get(),
                "handler unsubscribed"
            );
        } else {
            trace!(
                event = self.kind.name(),
                token = token.get(),
                "handler was already unsubscribed"
            );
        }
    }
}

#[derive(Debug, Default)]
struct WaitState {
    // Whether the owner is blocked in `wait()`.
    suspended: bool,

    // Only known once subscribing returns; the handler may run before that.
    token: Option<RegistrationToken>,

    // Set by the first delivery that passed validation.
    delivered: bool,
}

// State shared between the future and the handler registered with the sender.
struct Shared<S, P> {
    binding: Option<Binding<S, P>>,
    payload: OnceLock<P>,
    state: Mutex<WaitState>,
    callback: Option<Callback<P>>,
    pump: Arc<WaitPump>,
    affinity: AffinityGuard,
}

impl<S, P> Shared<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn new(
        binding: Option<Binding<S, P>>,
        callback: Option<Callback<P>>,
        pump: Arc<WaitPump>,
    ) -> Self {
        Self {
            binding,
            payload: OnceLock::new(),
            state: Mutex::new(WaitState::default()),
            callback,
            pump,
            affinity: AffinityGuard::new(),
        }
    }

    fn event_name(&self) -> &'static str {
        self.binding
            .as_ref()
            .map_or(UNBOUND_EVENT_NAME, |binding| binding.kind.name())
    }

    fn subscribe(this: &Arc<Self>) -> Result<()> {
        let Some(binding) = &this.binding else {
            return Ok(());
        };

        let token = binding
            .kind
            .subscribe(&binding.sender, Self::handler(this))
            .map_err(|source| Error::Subscribe {
                event: binding.kind.name(),
                source,
            })?;

        debug!(
            event = binding.kind.name(),
            token = token.get(),
            "handler subscribed"
        );

        let delivered = {
            let mut state = this.state.lock().expect(ERR_POISONED_LOCK);
            state.token = Some(token);
            state.delivered
        };

        // The event arrived before we knew our token, so the handler could not remove itself.
        if delivered {
            binding.unsubscribe(token);
        }

        Ok(())
    }

    // The handler only holds a weak reference, so a future dropped while its handler is still
    // registered does not stay alive because of the sender.
    fn handler(this: &Arc<Self>) -> Handler<S, P> {
        let shared = Arc::downgrade(this);

        Arc::new(move |observed: &S, payload: P| {
            shared.upgrade().map_or(HandlerStatus::Stale, |shared| {
                shared.deliver(observed, payload)
            })
        })
    }

    fn deliver(&self, observed: &S, payload: P) -> HandlerStatus {
        let Some(binding) = &self.binding else {
            return HandlerStatus::Stale;
        };

        if !ptr::eq(observed, Arc::as_ptr(&binding.sender)) {
            warn!(
                event = binding.kind.name(),
                "ignoring event raised by a sender other than the subscribed one"
            );
            return HandlerStatus::SenderMismatch;
        }

        if binding.kind.delivery() == Delivery::OwnerThread {
            if let Err(e) = self.affinity.check("event delivery") {
                error!(
                    event = binding.kind.name(),
                    error = %e,
                    "ignoring event delivered on a thread other than the owner"
                );
                return HandlerStatus::WrongThread;
            }
        }

        let token = {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            if state.delivered {
                drop(state);
                trace!(event = binding.kind.name(), "ignoring repeated delivery");
                return HandlerStatus::Stale;
            }

            state.delivered = true;
            state.token
        };

        if let Some(token) = token {
            binding.unsubscribe(token);
        }

        if !self.store(payload) {
            // The owner already provided the payload via `set()`.
            trace!(
                event = binding.kind.name(),
                "ignoring delivery to an already fulfilled future"
            );
            return HandlerStatus::Stale;
        }

        if let (Some(callback), Some(payload)) = (&self.callback, self.payload.get()) {
            callback(payload);
        }

        self.wake_owner();

        HandlerStatus::Handled
    }

    // Returns `false` without touching anything if the payload was already set.
    fn store(&self, payload: P) -> bool {
        self.payload.set(payload).is_ok()
    }

    fn wake_owner(&self) {
        let suspended = self.state.lock().expect(ERR_POISONED_LOCK).suspended;

        if suspended {
            self.pump.release();
        }
    }
}
