//! Connection lifecycle core for backend service adapters.
//!
//! Every adapter (message broker, cache, key-value store) shares the same
//! lifecycle: it is configured from a flat string mapping, dials its backend
//! under a retry policy, tracks whether it is connected and tells interested
//! parties exactly once per disconnect why the connection ended.
//! [`ServiceCore`] implements that lifecycle over any connector, which is a
//! `tower::Service` from the adapter's dial target to a [`Connection`].
//!
//! # Features
//!
//! - **Retrying dial**: bounded attempts driven by a [`DialPolicy`]
//! - **Live reconfiguration**: changed settings reset an open connection
//! - **Close notification**: `Closed` for orderly shutdowns, `Reset` otherwise
//! - **Watchdog**: connections that report backend closes are monitored
//! - **Event system**: observe dials, connects and disconnects
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tower_adapters_dial::DialPolicy;
//! use tower_adapters_service::{ServiceCore, SettingsMap, TcpConnector, TcpSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = ServiceCore::builder(TcpConnector::new(), TcpSettings::new("127.0.0.1:6379"))
//!     .name("redis")
//!     .dial_policy(DialPolicy::periodic(3, Duration::from_millis(500)))
//!     .build();
//!
//! redis.dial().await?;
//! let closed = redis.listen();
//!
//! // a changed endpoint drops the connection with a Reset
//! let params = SettingsMap::from([("endpoint".to_string(), "10.0.0.7:6379".to_string())]);
//! redis.config(&params).await?;
//! assert!(closed.await.is_reset());
//!
//! redis.dial().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`DialPolicy`]: tower_adapters_dial::DialPolicy

mod config;
mod connection;
mod events;
mod service;
mod settings;
mod source;
mod state;
mod tcp;

pub use config::{ServiceCoreBuilder, ServiceOption};
pub use connection::{close_signal, CloseSignal, Connection, Shutdown};
pub use events::ConnectionEvent;
pub use service::ServiceCore;
pub use settings::{
    parse_setting, update_field, ClusterSettings, CredentialSettings, EndpointSettings, Settings,
    SettingsMap, TcpSettings,
};
pub use source::{spawn_config_feed, ConfigSink};
pub use state::{ConnectionState, ConnectionStatus};
pub use tcp::{TcpConnection, TcpConnector, TcpTarget};

pub use tower_adapters_core::{AdapterError, CloseEvent, CloseListener, ConfigError};
