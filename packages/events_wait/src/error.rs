use std::thread::ThreadId;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when waiting for an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The event source refused to register the handler of a new [`EventFuture`][1].
    ///
    /// [1]: crate::EventFuture
    #[error("failed to subscribe to event '{event}'")]
    Subscribe {
        /// Name of the event kind, as given in its [`EventKind`][crate::EventKind].
        event: &'static str,

        /// The reason reported by the event source.
        #[source]
        source: SubscribeError,
    },

    /// An operation that is only valid on the thread that created an object was called
    /// from a different thread.
    #[error("{operation} called on thread {current:?} but the object belongs to thread {owner:?}")]
    WrongThread {
        /// The operation that was attempted.
        operation: &'static str,

        /// The thread that created the object.
        owner: ThreadId,

        /// The thread the operation was attempted on.
        current: ThreadId,
    },

    /// The event did not occur before the wait timed out.
    #[error("timed out after {timeout:?} waiting for a result of type {payload}")]
    TimedOut {
        /// Type name of the payload that was expected.
        payload: &'static str,

        /// The timeout the wait was performed with.
        timeout: Duration,
    },
}

/// A specialized `Result` type for event waiting operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Returned by an event source when it cannot register a handler.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct SubscribeError {
    reason: String,
}

impl SubscribeError {
    /// Creates an error carrying a human-readable description of why the
    /// subscription was refused.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The human-readable description of why the subscription was refused.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
