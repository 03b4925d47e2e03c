//! Shared mock connector.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tower::Service;
use tower_adapters_service::{CloseSignal, Connection, Shutdown, close_signal};

/// Connector that fails a configured number of times, then hands out
/// [`MockConnection`]s.
#[derive(Clone, Default)]
pub struct MockConnector {
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    targets: Arc<Mutex<Vec<String>>>,
    signals: Arc<Mutex<Vec<oneshot::Sender<Shutdown>>>>,
    latency: Duration,
    watched: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` connects.
    pub fn failing(self, times: usize) -> Self {
        self.fail_next(times);
        self
    }

    /// Like [`failing`](Self::failing), for a connector already handed out.
    pub fn fail_next(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn always_failing(self) -> Self {
        self.failing(usize::MAX)
    }

    /// Hand out connections that report backend closes.
    pub fn watched(mut self) -> Self {
        self.watched = true;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().clone()
    }

    /// Sender for the most recent connection's close signal.
    pub fn take_signal(&self) -> oneshot::Sender<Shutdown> {
        self.signals
            .lock()
            .pop()
            .expect("no watched connection handed out")
    }
}

pub struct MockConnection {
    closes: Arc<AtomicUsize>,
    signal: Option<CloseSignal>,
    pub target: String,
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl Connection for MockConnection {
    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }

    fn close_signal(&mut self) -> Option<CloseSignal> {
        self.signal.take()
    }
}

impl<T: std::fmt::Debug> Service<T> for MockConnector {
    type Response = MockConnection;
    type Error = std::io::Error;
    type Future = BoxFuture<'static, Result<MockConnection, std::io::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, target: T) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let target = format!("{target:?}");
        self.targets.lock().push(target.clone());

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let signal = (self.watched && !fail).then(|| {
            let (tx, signal) = close_signal();
            self.signals.lock().push(tx);
            signal
        });
        let closes = Arc::clone(&self.closes);
        let latency = self.latency;

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fail {
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "mock connection failure",
                ))
            } else {
                Ok(MockConnection {
                    closes,
                    signal,
                    target,
                })
            }
        })
    }
}

/// Route tracing output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

pub fn settings(pairs: &[(&str, &str)]) -> tower_adapters_service::SettingsMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
