//! Close notifier stress tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tower_adapters_core::{CloseEvent, CloseNotifier};

/// Test: one million listeners fanned out in batches
#[test]
#[ignore]
fn stress_one_million_listeners() {
    println!("\n=== Notifier: 1M listeners ===");

    let notifier = CloseNotifier::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let batches = 100;
    let per_batch = 10_000;
    for _ in 0..batches {
        for _ in 0..per_batch {
            let delivered = Arc::clone(&delivered);
            notifier.add(move |_| {
                delivered.fetch_add(1, Ordering::Relaxed);
            });
        }
        assert_eq!(notifier.notify_all(CloseEvent::Reset), per_batch);
    }
    let elapsed = start.elapsed();

    println!("  Time: {:?}", elapsed);
    println!(
        "  Throughput: {:.0} notifications/sec",
        (batches * per_batch) as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(delivered.load(Ordering::Relaxed), batches * per_batch);
    assert!(notifier.is_empty());
}
