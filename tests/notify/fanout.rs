use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tower_adapters_core::{CloseEvent, CloseNotifier};

#[tokio::test]
async fn closed_and_reset_are_distinguishable() {
    let notifier = CloseNotifier::new();

    let closed = notifier.listen();
    notifier.notify_all(CloseEvent::Closed);
    let reset = notifier.listen();
    notifier.notify_all(CloseEvent::Reset);

    let closed = closed.await;
    let reset = reset.await;
    assert!(closed.is_closed() && !closed.is_reset());
    assert!(reset.is_reset() && !reset.is_closed());
}

#[tokio::test]
async fn every_listener_notified_once() {
    let notifier = CloseNotifier::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..10).map(|_| notifier.listen()).collect();
    for _ in 0..10 {
        let calls = Arc::clone(&calls);
        notifier.add(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(notifier.notify_all(CloseEvent::Reset), 20);
    assert_eq!(notifier.notify_all(CloseEvent::Reset), 0);
    assert!(notifier.is_empty());

    for listener in futures {
        assert_eq!(listener.await, CloseEvent::Reset);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[test]
fn notify_without_listeners_is_noop() {
    let notifier = CloseNotifier::new();
    assert_eq!(notifier.notify_all(CloseEvent::Closed), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_and_notify() {
    let notifier = Arc::new(CloseNotifier::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let registrars: Vec<_> = (0..4)
        .map(|_| {
            let notifier = Arc::clone(&notifier);
            let delivered = Arc::clone(&delivered);
            tokio::spawn(async move {
                for _ in 0..250 {
                    let delivered = Arc::clone(&delivered);
                    notifier.add(move |_| {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    });
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let mut notified = 0;
    while registrars.iter().any(|h| !h.is_finished()) {
        notified += notifier.notify_all(CloseEvent::Reset);
        tokio::task::yield_now().await;
    }
    for handle in registrars {
        handle.await.unwrap();
    }
    notified += notifier.notify_all(CloseEvent::Reset);

    assert_eq!(notified, 1000);
    assert_eq!(delivered.load(Ordering::SeqCst), 1000);
}
