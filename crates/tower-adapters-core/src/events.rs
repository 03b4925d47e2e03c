//! Lifecycle event fan-out.
//!
//! An adapter reports dials, connects and disconnects as typed events. The
//! events go to whatever [`EventListeners`] it was built with; with none
//! registered, emitting costs one length check and the event is dropped. That
//! is the state of an adapter nobody has asked to observe.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// An event an adapter can emit.
pub trait LifecycleEvent: Send + Sync + fmt::Debug {
    /// Short snake_case tag, such as `"connected"` or `"dial_retry"`.
    fn event_type(&self) -> &'static str;

    /// When the transition happened.
    fn timestamp(&self) -> Instant;

    /// Name of the emitting adapter.
    fn adapter_name(&self) -> &str;
}

/// Receives lifecycle events.
///
/// Called synchronously on the emitting task, usually with the adapter lock
/// held. Implementations must not block or call back into the adapter.
pub trait EventListener<E: LifecycleEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// The listeners attached to one adapter.
///
/// Cloning shares the listeners themselves, so a clone handed to a second
/// adapter reports into the same sinks.
#[derive(Clone)]
pub struct EventListeners<E: LifecycleEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: LifecycleEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Registers a closure.
    pub fn add_fn<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
        E: 'static,
    {
        self.add(FnListener::new(f));
    }

    /// Hands `event` to each listener in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still see the
    /// event and the adapter's state transition goes ahead.
    pub fn emit(&self, event: &E) {
        if self.listeners.is_empty() {
            return;
        }
        for (index, listener) in self.listeners.iter().enumerate() {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if delivered.is_err() {
                tracing::warn!(
                    adapter = event.adapter_name(),
                    event = event.event_type(),
                    listener = index,
                    "event listener panicked"
                );
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: LifecycleEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LifecycleEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventListeners")
            .field(&self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: LifecycleEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
