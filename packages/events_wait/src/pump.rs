use std::sync::{Arc, Condvar, LazyLock, Mutex};
use std::time::Duration;

use crate::ERR_POISONED_LOCK;

static GLOBAL: LazyLock<Arc<WaitPump>> = LazyLock::new(|| Arc::new(WaitPump::new()));

/// Blocks a thread for up to a timeout, or until another party tells it to stop waiting.
///
/// Each [`suspend()`][Self::suspend] starts a new wait cycle: a [`release()`][Self::release]
/// that happened before the cycle started has no effect on it. Releasing while nobody is
/// suspended is a no-op.
///
/// The pump does not dispatch any work by itself. Whatever delivers the awaited event must keep
/// running while a thread is suspended here, typically on another thread.
///
/// Every [`EventFuture`][crate::EventFuture] gets a dedicated pump unless told otherwise, so
/// waits on independent events never wake each other. The process-wide instance from
/// [`global()`][Self::global] can be shared instead. A release then wakes every suspended
/// thread, so callers re-check their own condition after waking.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// use events_wait::WaitPump;
///
/// let pump = Arc::new(WaitPump::new());
///
/// let releaser = thread::spawn({
///     let pump = Arc::clone(&pump);
///     move || {
///         thread::sleep(Duration::from_millis(10));
///         pump.release();
///     }
/// });
///
/// // Returns early once released, although the release may also have happened
/// // before we started waiting, in which case we time out.
/// let _released = pump.suspend(Duration::from_millis(100));
/// releaser.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct WaitPump {
    stop_requested: Mutex<bool>,
    wake: Condvar,
}

impl WaitPump {
    /// Creates a pump with nobody suspended on it.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stop_requested: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// The process-wide pump, created on first use and kept alive for the rest of the process.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Blocks the calling thread until [`release()`][Self::release] is called or `timeout`
    /// elapses, whichever happens first.
    ///
    /// Returns `true` if released, `false` if the timeout elapsed.
    pub fn suspend(&self, timeout: Duration) -> bool {
        self.suspend_until(timeout, || false)
    }

    /// Like [`suspend()`][Self::suspend] but also returns as soon as `ready` returns `true`.
    ///
    /// `ready` is evaluated while holding the pump's lock, before blocking and after every
    /// wakeup. A result published before the suspend began is therefore never missed, as long
    /// as the publisher calls [`release()`][Self::release] after publishing.
    ///
    /// Returns `true` if released or ready, `false` if the timeout elapsed.
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub fn suspend_until(&self, timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
        let mut stop_requested = self.stop_requested.lock().expect(ERR_POISONED_LOCK);

        // A release from an earlier cycle must not end this one.
        *stop_requested = false;

        let (_stop_requested, result) = self
            .wake
            .wait_timeout_while(stop_requested, timeout, |stop_requested| {
                !*stop_requested && !ready()
            })
            .expect(ERR_POISONED_LOCK);

        !result.timed_out()
    }

    /// Wakes up any thread currently suspended on this pump.
    ///
    /// Does nothing if no thread is suspended.
    pub fn release(&self) {
        let mut stop_requested = self.stop_requested.lock().expect(ERR_POISONED_LOCK);
        *stop_requested = true;

        self.wake.notify_all();
    }
}
