use std::sync::Arc;

use crate::{EventFuture, EventKind, Result};

/// Blocks until `sender` raises the next event of `kind` and returns its payload.
///
/// This is shorthand for creating an [`EventFuture`] and calling [`EventFuture::get()`] on it,
/// returning a clone of the payload. Waits for at most [`DEFAULT_WAIT_TIMEOUT`][1].
///
/// The event must be delivered by another thread while the calling thread is blocked.
///
/// # Errors
///
/// Returns [`Error::Subscribe`][2] if the sender refuses to register the handler.
///
/// Returns [`Error::TimedOut`][3] if the event does not occur in time. The handler is
/// unregistered before returning.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// use events_wait::{ManualEvent, wait_event};
///
/// let sender = Arc::new(ManualEvent::<&str>::new());
///
/// let source = thread::spawn({
///     let sender = Arc::clone(&sender);
///     move || {
///         // Keep firing until the waiting side has subscribed.
///         while sender.fire("loaded") == 0 {
///             thread::sleep(Duration::from_millis(1));
///         }
///     }
/// });
///
/// assert_eq!(wait_event(ManualEvent::kind(), &sender).unwrap(), "loaded");
/// source.join().unwrap();
/// ```
///
/// [1]: crate::DEFAULT_WAIT_TIMEOUT
/// [2]: crate::Error::Subscribe
/// [3]: crate::Error::TimedOut
pub fn wait_event<S, P>(kind: EventKind<S, P>, sender: &Arc<S>) -> Result<P>
where
    S: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    get_cloned(EventFuture::new(kind, sender)?)
}

/// Like [`wait_event()`] but also calls `callback` with the payload on the thread that
/// delivers the event, before the waiting thread is released.
///
/// # Errors
///
/// Returns [`Error::Subscribe`][1] if the sender refuses to register the handler.
///
/// Returns [`Error::TimedOut`][2] if the event does not occur in time.
///
/// [1]: crate::Error::Subscribe
/// [2]: crate::Error::TimedOut
pub fn wait_event_with<S, P>(
    kind: EventKind<S, P>,
    sender: &Arc<S>,
    callback: impl Fn(&P) + Send + Sync + 'static,
) -> Result<P>
where
    S: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    get_cloned(
        EventFuture::builder()
            .bind(kind, sender)
            .callback(callback)
            .build()?,
    )
}

fn get_cloned<S, P>(future: EventFuture<S, P>) -> Result<P>
where
    S: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    let payload = future.get().cloned();

    if payload.is_err() {
        future.abandon();
    }

    payload
}
