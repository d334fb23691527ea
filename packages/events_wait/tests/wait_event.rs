//! End-to-end tests for waiting on events raised by event sources on other threads.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use events_wait::{
    Error, EventFuture, EventKind, Handler, HandlerStatus, ManualEvent, RegistrationToken,
    SubscribeError, wait_event, wait_event_with,
};

/// A browser-like sender that completes each requested navigation on a background thread.
#[derive(Default)]
struct Browser {
    handlers: Mutex<Vec<(RegistrationToken, Handler<Browser, NavigationCompleted>)>>,
    next_token: AtomicU64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NavigationCompleted {
    url: String,
    is_success: bool,
}

impl Browser {
    fn add_navigation_completed(
        &self,
        handler: Handler<Self, NavigationCompleted>,
    ) -> Result<RegistrationToken, SubscribeError> {
        let token = RegistrationToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().unwrap().push((token, handler));
        Ok(token)
    }

    fn remove_navigation_completed(&self, token: RegistrationToken) -> bool {
        let mut handlers = self.handlers.lock().unwrap();
        let count_before = handlers.len();
        handlers.retain(|(registered, _)| *registered != token);
        handlers.len() != count_before
    }

    fn navigate(self: &Arc<Self>, url: &str) -> thread::JoinHandle<()> {
        let browser = Arc::clone(self);
        let url = url.to_string();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));

            let handlers: Vec<_> = browser
                .handlers
                .lock()
                .unwrap()
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect();

            for handler in handlers {
                handler(
                    &browser,
                    NavigationCompleted {
                        url: url.clone(),
                        is_success: true,
                    },
                );
            }
        })
    }

    fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }
}

const NAVIGATION_COMPLETED: EventKind<Browser, NavigationCompleted> = EventKind::new(
    "navigation_completed",
    Browser::add_navigation_completed,
    Browser::remove_navigation_completed,
);

#[test]
fn wait_event_returns_payload_from_other_thread() {
    let browser = Arc::new(Browser::default());

    // Subscribe before navigating so the completion cannot be missed.
    let future = EventFuture::new(NAVIGATION_COMPLETED, &browser).unwrap();
    let navigation = browser.navigate("https://example.com/");

    let completed = future.get().unwrap();
    assert_eq!(completed.url, "https://example.com/");
    assert!(completed.is_success);

    navigation.join().unwrap();
    assert_eq!(browser.handler_count(), 0);
}

#[test]
fn wait_event_convenience_returns_clone() {
    let sender = Arc::new(ManualEvent::<String>::new());

    let source = thread::spawn({
        let sender = Arc::clone(&sender);
        move || {
            while sender.fire("ready".to_string()) == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
    });

    assert_eq!(wait_event(ManualEvent::kind(), &sender).unwrap(), "ready");

    source.join().unwrap();
    assert_eq!(sender.subscriber_count(), 0);
}

#[test]
fn wait_event_with_invokes_callback_once() {
    let sender = Arc::new(ManualEvent::<u32>::new());
    let callback_calls = Arc::new(AtomicUsize::new(0));

    let source = thread::spawn({
        let sender = Arc::clone(&sender);
        move || {
            while sender.fire(11) == 0 {
                thread::sleep(Duration::from_millis(1));
            }

            // Later events are not seen by the completed wait.
            sender.fire(12)
        }
    });

    let value = wait_event_with(ManualEvent::kind(), &sender, {
        let callback_calls = Arc::clone(&callback_calls);
        move |value: &u32| {
            assert_eq!(*value, 11);
            callback_calls.fetch_add(1, Ordering::Relaxed);
        }
    })
    .unwrap();

    assert_eq!(value, 11);
    assert_eq!(source.join().unwrap(), 0);
    assert_eq!(callback_calls.load(Ordering::Relaxed), 1);
}

#[test]
fn wait_event_reports_subscription_failure() {
    let sender = Arc::new(ManualEvent::<u32>::new());
    sender.reject_subscriptions("event source shut down");

    let result = wait_event(ManualEvent::kind(), &sender);

    assert!(matches!(result, Err(Error::Subscribe { event: "manual", .. })));
}

#[test]
fn timed_out_future_can_be_waited_on_again() {
    let browser = Arc::new(Browser::default());

    let future = EventFuture::builder()
        .bind(NAVIGATION_COMPLETED, &browser)
        .timeout(Duration::from_millis(30))
        .build()
        .unwrap();

    let started = Instant::now();
    assert!(!future.wait().unwrap());
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(future.try_get().unwrap().is_none());

    let navigation = browser.navigate("https://example.com/late");

    // The handler stayed registered across the timeouts.
    let deadline = Instant::now() + Duration::from_secs(5);
    let completed = loop {
        if let Some(completed) = future.try_get().unwrap() {
            break completed;
        }

        assert!(
            Instant::now() < deadline,
            "navigation did not complete within 5 seconds"
        );
    };

    assert_eq!(completed.url, "https://example.com/late");
    navigation.join().unwrap();
}

#[test]
fn sequential_futures_observe_successive_events() {
    let browser = Arc::new(Browser::default());

    for url in ["https://example.com/a", "https://example.com/b"] {
        let future = EventFuture::new(NAVIGATION_COMPLETED, &browser).unwrap();
        let navigation = browser.navigate(url);

        assert_eq!(future.get().unwrap().url, url);
        navigation.join().unwrap();
    }

    assert_eq!(browser.handler_count(), 0);
}

#[test]
fn future_used_from_other_thread_is_rejected() {
    let sender = Arc::new(ManualEvent::<u32>::new());
    let future = Arc::new(EventFuture::new(ManualEvent::kind(), &sender).unwrap());

    let result = thread::spawn({
        let future = Arc::clone(&future);
        move || future.get().map(|value| *value)
    })
    .join()
    .unwrap();

    assert!(matches!(result, Err(Error::WrongThread { .. })));

    // The owner can still complete the future normally.
    assert_eq!(sender.fire(3), 1);
    assert_eq!(*future.get().unwrap(), 3);
}

#[test]
fn later_events_only_reach_live_handlers() {
    let sender = Arc::new(ManualEvent::<u32>::new());

    let future = EventFuture::new(ManualEvent::kind(), &sender).unwrap();
    assert_eq!(sender.fire(1), 1);

    let later_calls = Arc::new(AtomicUsize::new(0));
    sender
        .subscribe(Arc::new({
            let later_calls = Arc::clone(&later_calls);
            move |_: &ManualEvent<u32>, _: u32| {
                later_calls.fetch_add(1, Ordering::Relaxed);
                HandlerStatus::Handled
            }
        }))
        .unwrap();

    // Only the subscriber registered after the first event sees the second one.
    assert_eq!(sender.fire(2), 1);
    assert_eq!(later_calls.load(Ordering::Relaxed), 1);
    assert_eq!(future.try_get().unwrap(), Some(&1));
}
