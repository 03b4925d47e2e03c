//! One-shot close notification fan-out.
//!
//! Consumers register a listener for the *next* close event of a connection.
//! [`CloseNotifier::notify_all`] delivers the event to every listener
//! registered at that moment and empties the registry, so each listener fires
//! at most once. Consumers that want future events register again.

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseEvent {
    /// Clean shutdown. Consumers should not redial automatically.
    Closed,

    /// Involuntary loss or live reconfiguration. Consumers are expected to
    /// redial if they want to keep working.
    Reset,
}

impl CloseEvent {
    /// Returns true for [`CloseEvent::Reset`].
    pub fn is_reset(self) -> bool {
        matches!(self, CloseEvent::Reset)
    }

    /// Returns true for [`CloseEvent::Closed`].
    pub fn is_closed(self) -> bool {
        matches!(self, CloseEvent::Closed)
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CloseEvent::Closed => "closed",
            CloseEvent::Reset => "reset",
        }
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Callback = Box<dyn FnOnce(CloseEvent) + Send>;

/// Registry of one-shot close listeners.
#[derive(Default)]
pub struct CloseNotifier {
    listeners: Mutex<Vec<Callback>>,
}

impl CloseNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for the next close event.
    pub fn add<F>(&self, callback: F)
    where
        F: FnOnce(CloseEvent) + Send + 'static,
    {
        self.listeners.lock().push(Box::new(callback));
    }

    /// Registers a oneshot sender for the next close event.
    ///
    /// A receiver dropped before the event is silently skipped.
    pub fn add_sender(&self, sender: oneshot::Sender<CloseEvent>) {
        self.add(move |event| {
            let _ = sender.send(event);
        });
    }

    /// Registers a listener and returns the future side of it.
    pub fn listen(&self) -> CloseListener {
        let (tx, rx) = oneshot::channel();
        self.add_sender(tx);
        CloseListener { rx }
    }

    /// Delivers `event` to every registered listener exactly once, then
    /// clears the registry. A no-op when nothing is registered.
    ///
    /// Listeners run after the registry lock is released, so a listener may
    /// register itself again for the following event.
    pub fn notify_all(&self, event: CloseEvent) -> usize {
        let listeners = std::mem::take(&mut *self.listeners.lock());
        let notified = listeners.len();
        for listener in listeners {
            listener(event);
        }
        notified
    }

    /// Number of listeners waiting for the next event.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl fmt::Debug for CloseNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseNotifier")
            .field("listeners", &self.len())
            .finish()
    }
}

/// The receiving side of a close registration.
///
/// Resolves once with the terminal [`CloseEvent`]. If the notifier is torn
/// down without ever firing, the listener resolves to [`CloseEvent::Closed`].
#[derive(Debug)]
pub struct CloseListener {
    rx: oneshot::Receiver<CloseEvent>,
}

impl CloseListener {
    /// Returns the event if it has already been delivered.
    pub fn try_event(&mut self) -> Option<CloseEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(CloseEvent::Closed),
        }
    }
}

impl Future for CloseListener {
    type Output = CloseEvent;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(CloseEvent::Closed))
    }
}
