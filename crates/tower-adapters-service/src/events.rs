use std::time::{Duration, Instant};
use tower_adapters_core::events::LifecycleEvent;
use tower_adapters_core::CloseEvent;

/// Events emitted by a [`ServiceCore`](crate::ServiceCore).
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A connect attempt is about to be made.
    DialAttempt {
        adapter: String,
        timestamp: Instant,
        attempt: u32,
    },
    /// A connect attempt failed and the next one is scheduled after `delay`.
    DialRetry {
        adapter: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// The dial policy ran out of attempts.
    DialExhausted {
        adapter: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// A connection was established.
    Connected {
        adapter: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// The connection ended and listeners were notified.
    Disconnected {
        adapter: String,
        timestamp: Instant,
        reason: CloseEvent,
    },
    /// New settings were applied.
    ConfigChanged {
        adapter: String,
        timestamp: Instant,
    },
    /// A settings mapping was rejected.
    ConfigRejected {
        adapter: String,
        timestamp: Instant,
        key: String,
    },
}

impl LifecycleEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::DialAttempt { .. } => "DialAttempt",
            ConnectionEvent::DialRetry { .. } => "DialRetry",
            ConnectionEvent::DialExhausted { .. } => "DialExhausted",
            ConnectionEvent::Connected { .. } => "Connected",
            ConnectionEvent::Disconnected { .. } => "Disconnected",
            ConnectionEvent::ConfigChanged { .. } => "ConfigChanged",
            ConnectionEvent::ConfigRejected { .. } => "ConfigRejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::DialAttempt { timestamp, .. }
            | ConnectionEvent::DialRetry { timestamp, .. }
            | ConnectionEvent::DialExhausted { timestamp, .. }
            | ConnectionEvent::Connected { timestamp, .. }
            | ConnectionEvent::Disconnected { timestamp, .. }
            | ConnectionEvent::ConfigChanged { timestamp, .. }
            | ConnectionEvent::ConfigRejected { timestamp, .. } => *timestamp,
        }
    }

    fn adapter_name(&self) -> &str {
        match self {
            ConnectionEvent::DialAttempt { adapter, .. }
            | ConnectionEvent::DialRetry { adapter, .. }
            | ConnectionEvent::DialExhausted { adapter, .. }
            | ConnectionEvent::Connected { adapter, .. }
            | ConnectionEvent::Disconnected { adapter, .. }
            | ConnectionEvent::ConfigChanged { adapter, .. }
            | ConnectionEvent::ConfigRejected { adapter, .. } => adapter,
        }
    }
}
