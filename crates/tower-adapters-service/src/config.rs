use std::sync::Arc;
use std::time::Duration;

use tower::Service;
use tower_adapters_core::{BoxError, CloseEvent, EventListeners};
use tower_adapters_dial::{DialPolicy, RetryPolicy, SharedPolicy};

use crate::connection::Connection;
use crate::events::ConnectionEvent;
use crate::service::ServiceCore;
use crate::settings::{Settings, SettingsMap};

/// Builder for a [`ServiceCore`].
///
/// Defaults: name `"adapter"`, dial policy `Periodic(1, 1s)`, no event
/// listeners.
pub struct ServiceCoreBuilder<S, M> {
    connector: M,
    settings: S,
    name: String,
    policy: SharedPolicy,
    listeners: EventListeners<ConnectionEvent>,
}

impl<S, M> ServiceCoreBuilder<S, M>
where
    S: Settings,
    M: Service<S::Target> + Send + 'static,
    M::Response: Connection,
    M::Error: Into<BoxError>,
    M::Future: Send,
{
    pub(crate) fn new(connector: M, settings: S) -> Self {
        Self {
            connector,
            settings,
            name: String::from("adapter"),
            policy: DialPolicy::default().shared(),
            listeners: EventListeners::new(),
        }
    }

    /// Give the adapter a name for logs and events.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_adapters_service::{ServiceCore, TcpConnector, TcpSettings};
    ///
    /// let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new("127.0.0.1:6379"))
    ///     .name("redis")
    ///     .build();
    /// assert_eq!(core.name(), "redis");
    /// ```
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the dial policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tower_adapters_dial::DialPolicy;
    /// use tower_adapters_service::{ServiceCore, TcpConnector, TcpSettings};
    ///
    /// let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new("127.0.0.1:5672"))
    ///     .dial_policy(DialPolicy::exponential(5, Duration::from_millis(50)))
    ///     .build();
    /// ```
    pub fn dial_policy<P>(mut self, policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    /// Sets an already shared dial policy.
    pub fn shared_dial_policy(mut self, policy: SharedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the event listeners.
    pub fn event_listeners(mut self, listeners: EventListeners<ConnectionEvent>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Register a callback for every lifecycle event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.listeners.add_fn(f);
        self
    }

    /// Register a callback for failed dial attempts that will be retried.
    ///
    /// The callback receives the attempt number and the wait before the next
    /// attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_adapters_service::{ServiceCore, TcpConnector, TcpSettings};
    ///
    /// let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new("127.0.0.1:2379"))
    ///     .on_dial_retry(|attempt, delay| {
    ///         println!("dial attempt {} failed, retrying in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_dial_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.listeners.add_fn(move |event| {
            if let ConnectionEvent::DialRetry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        });
        self
    }

    /// Register a callback for every disconnect.
    pub fn on_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn(CloseEvent) + Send + Sync + 'static,
    {
        self.listeners.add_fn(move |event| {
            if let ConnectionEvent::Disconnected { reason, .. } = event {
                f(*reason);
            }
        });
        self
    }

    /// Builds the core. It starts disconnected.
    pub fn build(self) -> ServiceCore<S, M> {
        ServiceCore::from_parts(
            self.name,
            self.connector,
            self.settings,
            self.policy,
            self.listeners,
        )
    }
}

impl<S: std::fmt::Debug, M> std::fmt::Debug for ServiceCoreBuilder<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCoreBuilder")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A setting applied through [`ServiceCore::set_options`].
pub enum ServiceOption {
    /// Apply a settings mapping, as [`ServiceCore::config`] does.
    Config(SettingsMap),
    /// Replace the dial policy.
    DialPolicy(SharedPolicy),
    /// Replace the lifecycle event listeners.
    EventListeners(EventListeners<ConnectionEvent>),
}

impl ServiceOption {
    /// An option applying `params`.
    pub fn config<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ServiceOption::Config(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// An option installing `policy`.
    pub fn dial_policy<P>(policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        ServiceOption::DialPolicy(Arc::new(policy))
    }

    /// An option installing `listeners`.
    pub fn event_listeners(listeners: EventListeners<ConnectionEvent>) -> Self {
        ServiceOption::EventListeners(listeners)
    }
}

impl std::fmt::Debug for ServiceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceOption::Config(params) => f.debug_tuple("Config").field(&params.len()).finish(),
            ServiceOption::DialPolicy(_) => f.write_str("DialPolicy"),
            ServiceOption::EventListeners(listeners) => {
                f.debug_tuple("EventListeners").field(&listeners.len()).finish()
            }
        }
    }
}
