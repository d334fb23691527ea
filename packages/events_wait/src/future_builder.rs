use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::future::Callback;
use crate::{DEFAULT_WAIT_TIMEOUT, EventFuture, EventKind, Result, WaitPump};

/// Creates instances of [`EventFuture`].
///
/// Use `EventFuture::builder()` to create a new instance of this builder.
///
/// All parameters are optional. A future built without [`bind()`][Self::bind] is not
/// subscribed to anything and can only be fulfilled via [`EventFuture::set()`].
pub struct EventFutureBuilder<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) binding: Option<(EventKind<S, P>, Arc<S>)>,
    pub(crate) callback: Option<Callback<P>>,
    pub(crate) timeout: Duration,

    /// Defaults to a dedicated pump for each future.
    pub(crate) pump: Option<Arc<WaitPump>>,
}

impl<S, P> EventFutureBuilder<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            binding: None,
            callback: None,
            timeout: DEFAULT_WAIT_TIMEOUT,
            pump: None,
        }
    }

    /// Subscribes the future to the next occurrence of `kind` raised by `sender`.
    ///
    /// The future keeps the sender alive for as long as the future exists.
    #[must_use]
    pub fn bind(self, kind: EventKind<S, P>, sender: &Arc<S>) -> Self {
        Self {
            binding: Some((kind, Arc::clone(sender))),
            ..self
        }
    }

    /// Sets a function to call with the payload when it arrives.
    ///
    /// The callback runs on whichever thread delivers the event, before any waiting thread
    /// is released.
    #[must_use]
    pub fn callback(self, callback: impl Fn(&P) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..self
        }
    }

    /// Sets how long each [`EventFuture::wait()`] blocks before giving up.
    ///
    /// The default is [`DEFAULT_WAIT_TIMEOUT`].
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Sets the pump to suspend on while waiting.
    ///
    /// By default each future gets a dedicated pump. Pass [`WaitPump::global()`] to share
    /// the process-wide pump instead. Fulfilling any future sharing the pump wakes every
    /// thread suspended on it, and the threads whose payload is still missing go back to
    /// waiting for the rest of their timeout.
    #[must_use]
    pub fn pump(self, pump: Arc<WaitPump>) -> Self {
        Self {
            pump: Some(pump),
            ..self
        }
    }

    /// Creates the future, subscribing it to the event if one was bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subscribe`][crate::Error::Subscribe] if the sender refuses to
    /// register the handler.
    pub fn build(self) -> Result<EventFuture<S, P>> {
        EventFuture::from_builder(self)
    }
}

impl<S, P> fmt::Debug for EventFutureBuilder<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFutureBuilder")
            .field("event", &self.binding.as_ref().map(|(kind, _)| kind.name()))
            .field("has_callback", &self.callback.is_some())
            .field("timeout", &self.timeout)
            .field("pump", &self.pump)
            .finish()
    }
}
