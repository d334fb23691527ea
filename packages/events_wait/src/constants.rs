use std::time::Duration;

// A poisoned lock means the process is in an unrecoverable/unsafe state and must exit (we panic).
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - continued execution \
    is not safe because we can no longer ensure that we uphold the single-delivery guarantee";

/// How long [`EventFuture::wait()`][crate::EventFuture::wait] blocks before giving up, unless the
/// future was built with a different timeout via
/// [`EventFutureBuilder::timeout()`][crate::EventFutureBuilder::timeout].
///
/// The timeout is fixed for the lifetime of a future; individual calls cannot override it.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
