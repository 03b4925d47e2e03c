//! Lock-free connection status for observers.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Connection state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live backend connection.
    Disconnected,

    /// A dial is in progress.
    Connecting,

    /// Connected and usable.
    Connected,
}

/// Shared status snapshot of one adapter.
///
/// Written by the adapter while it holds its own lock; readable from anywhere
/// without blocking.
#[derive(Clone)]
pub struct ConnectionStatus {
    inner: Arc<StatusCell>,
}

struct StatusCell {
    connected: AtomicBool,

    /// Dials currently in flight.
    dialing: AtomicU32,

    /// Successful connections over the adapter's lifetime.
    connects: AtomicU64,

    /// Millis since `epoch` of the last successful connection, plus one.
    /// Zero means never connected.
    last_connected: AtomicU64,

    epoch: Instant,
}

impl ConnectionStatus {
    /// Create a new, disconnected status.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatusCell {
                connected: AtomicBool::new(false),
                dialing: AtomicU32::new(0),
                connects: AtomicU64::new(0),
                last_connected: AtomicU64::new(0),
                epoch: Instant::now(),
            }),
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        if self.inner.connected.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else if self.inner.dialing.load(Ordering::Acquire) > 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Returns true while a backend connection is established.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Number of dials currently in flight.
    pub fn dialing(&self) -> u32 {
        self.inner.dialing.load(Ordering::Acquire)
    }

    /// Number of successful connections so far.
    pub fn connects(&self) -> u64 {
        self.inner.connects.load(Ordering::Acquire)
    }

    /// Get time since last successful connection
    pub fn time_since_connected(&self) -> Option<Duration> {
        match self.inner.last_connected.load(Ordering::Acquire) {
            0 => None,
            stamp => {
                let now = self.elapsed_millis();
                Some(Duration::from_millis(now.saturating_sub(stamp - 1)))
            }
        }
    }

    pub(crate) fn mark_connected(&self) {
        self.inner.connects.fetch_add(1, Ordering::AcqRel);
        self.inner
            .last_connected
            .store(self.elapsed_millis() + 1, Ordering::Release);
        self.inner.connected.store(true, Ordering::Release);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.inner.connected.store(false, Ordering::Release);
    }

    /// Counts a dial as in flight until the returned guard is dropped, which
    /// also covers a dial future cancelled mid back-off.
    pub(crate) fn begin_dial(&self) -> DialGuard {
        self.inner.dialing.fetch_add(1, Ordering::AcqRel);
        DialGuard {
            status: self.clone(),
        }
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.inner.epoch.elapsed().as_millis()).unwrap_or(u64::MAX - 1)
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStatus")
            .field("state", &self.state())
            .field("dialing", &self.dialing())
            .field("connects", &self.connects())
            .finish()
    }
}

pub(crate) struct DialGuard {
    status: ConnectionStatus,
}

impl Drop for DialGuard {
    fn drop(&mut self) {
        self.status.inner.dialing.fetch_sub(1, Ordering::AcqRel);
    }
}
