use std::sync::{Arc, Weak};
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tower::{Service, ServiceExt};
use tower_adapters_core::{
    AdapterError, BoxError, CloseEvent, CloseListener, CloseNotifier, ConfigError, EventListeners,
};
use tower_adapters_dial::SharedPolicy;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::config::{ServiceCoreBuilder, ServiceOption};
use crate::connection::{CloseSignal, Connection, Shutdown};
use crate::events::ConnectionEvent;
use crate::settings::{Settings, SettingsMap};
use crate::state::{ConnectionState, ConnectionStatus};

/// Connection lifecycle state machine shared by service adapters.
///
/// A `ServiceCore` owns the settings, the connector (any
/// `tower::Service<S::Target>` producing a [`Connection`]) and, while
/// connected, the connection itself. Every mutable field sits behind one
/// async lock; clones share the same adapter.
///
/// `dial` on a connected core fails with [`AdapterError::AlreadyConnected`].
/// The same applies when a concurrent dial wins while this one is backing
/// off.
pub struct ServiceCore<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    inner: Arc<Inner<S, M>>,
}

impl<S, M> Clone for ServiceCore<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    name: String,
    state: Mutex<State<S, M>>,
    notifier: CloseNotifier,
    status: ConnectionStatus,
}

struct State<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    settings: S,
    connector: M,
    policy: SharedPolicy,
    listeners: EventListeners<ConnectionEvent>,
    conn: Option<M::Response>,
    /// Bumped on every successful connect; a watchdog only acts on its own.
    generation: u64,
    watchdog: Option<JoinHandle<()>>,
}

impl<S, M> Drop for State<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

impl<S, M> ServiceCore<S, M>
where
    S: Settings,
    M: Service<S::Target> + Send + 'static,
    M::Response: Connection,
    M::Error: Into<BoxError>,
    M::Future: Send,
{
    /// Creates a builder for a core dialing `settings` through `connector`.
    pub fn builder(connector: M, settings: S) -> ServiceCoreBuilder<S, M> {
        ServiceCoreBuilder::new(connector, settings)
    }

    /// Creates a core with default name, dial policy and no event listeners.
    pub fn new(connector: M, settings: S) -> Self {
        Self::builder(connector, settings).build()
    }

    pub(crate) fn from_parts(
        name: String,
        connector: M,
        settings: S,
        policy: SharedPolicy,
        listeners: EventListeners<ConnectionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                state: Mutex::new(State {
                    settings,
                    connector,
                    policy,
                    listeners,
                    conn: None,
                    generation: 0,
                    watchdog: None,
                }),
                notifier: CloseNotifier::new(),
                status: ConnectionStatus::new(),
            }),
        }
    }

    /// The adapter's name, used in logs and events.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current connection state, read without locking.
    pub fn state(&self) -> ConnectionState {
        self.inner.status.state()
    }

    /// Returns true while connected.
    pub fn is_connected(&self) -> bool {
        self.inner.status.is_connected()
    }

    /// Shared status handle for observers.
    pub fn status(&self) -> &ConnectionStatus {
        &self.inner.status
    }

    /// A copy of the current settings.
    pub async fn settings(&self) -> S {
        self.inner.state.lock().await.settings.clone()
    }

    /// Connects to the backend.
    ///
    /// Resets the dial policy, then attempts to connect until an attempt
    /// succeeds or the policy is exhausted. The lock is released while
    /// sleeping between attempts. On success the policy is reset again and, if
    /// the connection reports closes, a watchdog is started for it.
    pub async fn dial(&self) -> Result<(), AdapterError> {
        let _dialing = self.inner.status.begin_dial();
        let state = self.inner.state.lock().await;
        if state.conn.is_some() {
            debug!(adapter = %self.inner.name, "dial skipped; already connected");
            return Err(AdapterError::AlreadyConnected);
        }

        let (mut state, result) = self.inner.connect_with_retry(state, Dialer::Adapter).await;
        let (conn, attempts) = result?;
        self.install(&mut state, conn, attempts);
        Ok(())
    }

    /// Dials an extra connection for a backend-managed pool.
    ///
    /// Follows the same retry contract as [`dial`](Self::dial) using the
    /// current settings, but hands the connection to the caller and leaves the
    /// core's own state untouched. Each call counts attempts on a fork of the
    /// dial policy, so it never shortens or extends a concurrent `dial`.
    pub async fn dial_pooled(&self) -> Result<M::Response, AdapterError> {
        let state = self.inner.state.lock().await;
        let policy = state.policy.fork();
        let (_state, result) = self
            .inner
            .connect_with_retry(state, Dialer::Pooled(policy))
            .await;
        result.map(|(conn, _)| conn)
    }

    /// Disconnects and notifies listeners with [`CloseEvent::Closed`].
    ///
    /// A no-op when not connected, so calling it twice is safe.
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if state.conn.is_none() {
            return;
        }
        info!(adapter = %self.inner.name, "closing connection");
        self.inner
            .teardown(&mut state, CloseEvent::Closed, false)
            .await;
    }

    /// Applies a settings mapping.
    ///
    /// Returns whether any recognized value changed. A change on a connected
    /// core disconnects it and notifies listeners with [`CloseEvent::Reset`];
    /// consumers redial to pick up the new settings. A malformed value rejects
    /// the whole mapping and leaves the settings untouched.
    pub async fn config(&self, params: &SettingsMap) -> Result<bool, ConfigError> {
        let mut state = self.inner.state.lock().await;

        let mut staged = state.settings.clone();
        let changed = match staged.apply(params) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(adapter = %self.inner.name, key = err.key(), error = %err, "configuration rejected");
                self.inner.emit(
                    &state,
                    ConnectionEvent::ConfigRejected {
                        adapter: self.inner.name.clone(),
                        timestamp: Instant::now(),
                        key: err.key().to_string(),
                    },
                );
                return Err(err);
            }
        };

        if !changed {
            return Ok(false);
        }

        info!(adapter = %self.inner.name, settings = ?staged, "configuration changed");
        state.settings = staged;
        state.policy.reset_attempts();
        self.inner.emit(
            &state,
            ConnectionEvent::ConfigChanged {
                adapter: self.inner.name.clone(),
                timestamp: Instant::now(),
            },
        );

        if state.conn.is_some() {
            self.inner
                .teardown(&mut state, CloseEvent::Reset, false)
                .await;
        }
        Ok(true)
    }

    /// Replaces the dial policy. Takes effect from the next retry onward.
    pub async fn set_dial_policy(&self, policy: SharedPolicy) {
        self.inner.state.lock().await.policy = policy;
    }

    /// Replaces the lifecycle event listeners.
    pub async fn set_event_listeners(&self, listeners: EventListeners<ConnectionEvent>) {
        self.inner.state.lock().await.listeners = listeners;
    }

    /// Applies options in order, stopping at the first one that fails.
    pub async fn set_options<I>(&self, options: I) -> Result<(), AdapterError>
    where
        I: IntoIterator<Item = ServiceOption>,
    {
        for option in options {
            match option {
                ServiceOption::Config(params) => {
                    self.config(&params).await?;
                }
                ServiceOption::DialPolicy(policy) => self.set_dial_policy(policy).await,
                ServiceOption::EventListeners(listeners) => {
                    self.set_event_listeners(listeners).await
                }
            }
        }
        Ok(())
    }

    /// Registers a listener for the next close event.
    pub fn listen(&self) -> CloseListener {
        self.inner.notifier.listen()
    }

    /// Registers a callback for the next close event.
    pub fn on_close<F>(&self, callback: F)
    where
        F: FnOnce(CloseEvent) + Send + 'static,
    {
        self.inner.notifier.add(callback);
    }

    /// Runs `f` against the live connection.
    ///
    /// Fails with [`AdapterError::ConnectionClosed`] while disconnected.
    pub async fn with_connection<F, R>(&self, f: F) -> Result<R, AdapterError>
    where
        F: FnOnce(&mut M::Response) -> R,
    {
        let mut state = self.inner.state.lock().await;
        state
            .conn
            .as_mut()
            .map(f)
            .ok_or(AdapterError::ConnectionClosed)
    }

    fn install(&self, state: &mut State<S, M>, mut conn: M::Response, attempts: u32) {
        state.generation = state.generation.wrapping_add(1);
        let signal = conn.close_signal();
        state.conn = Some(conn);
        state.policy.reset_attempts();
        self.inner.status.mark_connected();

        if let Some(signal) = signal {
            state.watchdog = Some(spawn_watchdog(
                Arc::downgrade(&self.inner),
                state.generation,
                signal,
            ));
        }

        info!(adapter = %self.inner.name, attempts, "connected");
        #[cfg(feature = "metrics")]
        {
            counter!("adapter_connections_total", "adapter" => self.inner.name.clone())
                .increment(1);
            gauge!("adapter_connected", "adapter" => self.inner.name.clone()).set(1.0);
        }
        self.inner.emit(
            state,
            ConnectionEvent::Connected {
                adapter: self.inner.name.clone(),
                timestamp: Instant::now(),
                attempts,
            },
        );
    }
}

impl<S, M> Inner<S, M>
where
    S: Settings,
    M: Service<S::Target> + Send + 'static,
    M::Response: Connection,
    M::Error: Into<BoxError>,
    M::Future: Send,
{
    fn emit(&self, state: &State<S, M>, event: ConnectionEvent) {
        state.listeners.emit(&event);
    }

    /// The dial retry loop. Hands the guard back so the caller can finish its
    /// transition under the same lock.
    ///
    /// For [`Dialer::Adapter`], a connection established by someone else while
    /// this call slept ends the loop with `AlreadyConnected`.
    async fn connect_with_retry<'a>(
        &'a self,
        mut state: MutexGuard<'a, State<S, M>>,
        dialer: Dialer,
    ) -> (
        MutexGuard<'a, State<S, M>>,
        Result<(M::Response, u32), AdapterError>,
    ) {
        match &dialer {
            Dialer::Adapter => state.policy.reset_attempts(),
            Dialer::Pooled(policy) => policy.reset_attempts(),
        }
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let target = state.settings.target();

            debug!(adapter = %self.name, attempt = attempts, "dialing backend");
            #[cfg(feature = "metrics")]
            counter!("adapter_dial_attempts_total", "adapter" => self.name.clone()).increment(1);
            self.emit(
                &state,
                ConnectionEvent::DialAttempt {
                    adapter: self.name.clone(),
                    timestamp: Instant::now(),
                    attempt: attempts,
                },
            );

            let err: BoxError = {
                let result = match ServiceExt::<S::Target>::ready(&mut state.connector).await {
                    Ok(connector) => connector.call(target).await,
                    Err(err) => Err(err),
                };
                match result {
                    Ok(conn) => return (state, Ok((conn, attempts))),
                    Err(err) => err.into(),
                }
            };

            let policy = match &dialer {
                Dialer::Adapter => Arc::clone(&state.policy),
                Dialer::Pooled(policy) => Arc::clone(policy),
            };
            let Some(delay) = policy.next_retry() else {
                warn!(
                    adapter = %self.name,
                    attempts,
                    error = %err,
                    "could not connect; dial attempts exhausted"
                );
                #[cfg(feature = "metrics")]
                counter!("adapter_dial_exhausted_total", "adapter" => self.name.clone())
                    .increment(1);
                self.emit(
                    &state,
                    ConnectionEvent::DialExhausted {
                        adapter: self.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                    },
                );
                return (
                    state,
                    Err(AdapterError::DialExhausted {
                        attempts,
                        source: err,
                    }),
                );
            };

            debug!(adapter = %self.name, attempt = attempts, ?delay, error = %err, "dial failed; retrying");
            self.emit(
                &state,
                ConnectionEvent::DialRetry {
                    adapter: self.name.clone(),
                    timestamp: Instant::now(),
                    attempt: attempts,
                    delay,
                },
            );

            drop(state);
            tokio::time::sleep(delay).await;
            state = self.state.lock().await;

            if matches!(dialer, Dialer::Adapter) && state.conn.is_some() {
                debug!(adapter = %self.name, "connected by a concurrent dial");
                return (state, Err(AdapterError::AlreadyConnected));
            }
        }
    }

    /// Moves a connected core to disconnected and notifies listeners once.
    ///
    /// `lost` is set when the backend already ended the connection; the
    /// handle is then dropped without closing and the calling watchdog is
    /// detached rather than aborted.
    async fn teardown(&self, state: &mut State<S, M>, reason: CloseEvent, lost: bool) {
        let watchdog = state.watchdog.take();
        if !lost {
            if let Some(watchdog) = watchdog {
                watchdog.abort();
            }
        }

        if let Some(mut conn) = state.conn.take() {
            if !lost {
                conn.close().await;
            }
        }
        self.status.mark_disconnected();

        #[cfg(feature = "metrics")]
        {
            counter!("adapter_disconnects_total", "adapter" => self.name.clone(), "reason" => reason.as_str())
                .increment(1);
            gauge!("adapter_connected", "adapter" => self.name.clone()).set(0.0);
        }
        self.emit(
            state,
            ConnectionEvent::Disconnected {
                adapter: self.name.clone(),
                timestamp: Instant::now(),
                reason,
            },
        );

        let notified = self.notifier.notify_all(reason);
        debug!(adapter = %self.name, %reason, notified, "close listeners notified");
    }

    async fn connection_lost(&self, generation: u64, shutdown: Shutdown) {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.conn.is_none() {
            return;
        }

        match shutdown {
            Shutdown::Clean => info!(adapter = %self.name, "backend closed the connection"),
            Shutdown::Abrupt => warn!(adapter = %self.name, "lost connection to backend"),
        }
        self.teardown(&mut state, shutdown.into(), true).await;
    }
}

/// Who a dial loop is connecting for.
enum Dialer {
    /// The core's own connection, counted on the installed policy.
    Adapter,
    /// A caller-owned pool connection with its own counter.
    Pooled(SharedPolicy),
}

fn spawn_watchdog<S, M>(
    inner: Weak<Inner<S, M>>,
    generation: u64,
    signal: CloseSignal,
) -> JoinHandle<()>
where
    S: Settings,
    M: Service<S::Target> + Send + 'static,
    M::Response: Connection,
    M::Error: Into<BoxError>,
    M::Future: Send,
{
    tokio::spawn(async move {
        let shutdown = signal.await;
        if let Some(inner) = inner.upgrade() {
            inner.connection_lost(generation, shutdown).await;
        }
    })
}

impl<S, M> std::fmt::Debug for ServiceCore<S, M>
where
    S: Settings,
    M: Service<S::Target>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("name", &self.inner.name)
            .field("status", &self.inner.status)
            .field("close_listeners", &self.inner.notifier.len())
            .finish()
    }
}
