//! Waits for events raised by a background "download" worker that reports progress through
//! a callback-style subscription API.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use events_wait::{EventFuture, ManualEvent, wait_event_with};

fn main() {
    let completed = Arc::new(ManualEvent::<u64>::new());

    // Subscribe first, then start the work, so the completion cannot be missed.
    let future = EventFuture::builder()
        .bind(ManualEvent::kind(), &completed)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("manual events accept every subscription");

    let worker = start_download(Arc::clone(&completed), 4096);

    match future.get() {
        Ok(bytes) => println!("download completed: {bytes} bytes"),
        Err(e) => println!("download did not complete: {e}"),
    }

    worker.join().expect("worker thread panicked");

    // The one-call form, with a callback that runs on the worker thread.
    let worker = start_download(Arc::clone(&completed), 8192);

    let bytes = wait_event_with(ManualEvent::kind(), &completed, |bytes: &u64| {
        println!("callback on {:?}: {bytes} bytes", thread::current().id());
    })
    .expect("download should complete in time");

    println!("second download completed: {bytes} bytes");

    worker.join().expect("worker thread panicked");
}

fn start_download(completed: Arc<ManualEvent<u64>>, size: u64) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));

        // Keep reporting until somebody is listening.
        while completed.fire(size) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    })
}
