//! Helpers shared by the unit tests of this crate.

use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::ManualEvent;

/// Runs a test on a separate thread and fails it if it has not completed within 10 seconds,
/// so a wait that never gets released cannot hang the test run.
///
/// Waiting happens on the watchdog-spawned thread, which therefore owns any futures created
/// inside `test_fn`.
pub(crate) fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    // Under mutation testing, hanging mutations must be allowed to hang.
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    match rx.recv_timeout(Duration::from_secs(10)) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded 10-second timeout - likely stuck waiting for an event");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Fires `payload` on `sender` from a new thread after `delay`.
///
/// The returned handle yields how many handlers accepted the payload.
pub(crate) fn fire_after<P>(
    sender: &Arc<ManualEvent<P>>,
    delay: Duration,
    payload: P,
) -> JoinHandle<usize>
where
    P: Clone + Send + Sync + 'static,
{
    let sender = Arc::clone(sender);

    thread::spawn(move || {
        thread::sleep(delay);
        sender.fire(payload)
    })
}
