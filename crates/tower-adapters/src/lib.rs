//! Lifecycle plumbing for backend service adapters.
//!
//! `tower-adapters` bundles the pieces an adapter for a message broker, cache
//! or key-value store needs to manage its connection. Each piece is available
//! as a standalone crate and as a feature here.
//!
//! # Components
//!
//! - **Core** (always): lifecycle events, [`CloseNotifier`](core::CloseNotifier)
//!   and the error taxonomy
//! - **Dial** (`dial` feature): dial retry policies
//! - **Service** (`service` feature): the [`ServiceCore`](service::ServiceCore)
//!   connection state machine, stock settings and a TCP connector
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! tower-adapters = { version = "0.1", features = ["service"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "service")]
//! # {
//! use std::time::Duration;
//! use tower_adapters::dial::DialPolicy;
//! use tower_adapters::service::{ServiceCore, TcpConnector, TcpSettings};
//!
//! # async fn example() {
//! let broker = ServiceCore::builder(TcpConnector::new(), TcpSettings::new("127.0.0.1:5672"))
//!     .name("amqp")
//!     .dial_policy(DialPolicy::exponential(6, Duration::from_millis(100)))
//!     .on_disconnected(|reason| eprintln!("broker connection ended: {reason}"))
//!     .build();
//!
//! if let Err(err) = broker.dial().await {
//!     eprintln!("broker unavailable: {err}");
//! }
//! # }
//! # }
//! ```

// Re-export core (always available)
pub use tower_adapters_core as core;

#[cfg(feature = "dial")]
pub use tower_adapters_dial as dial;

#[cfg(feature = "service")]
pub use tower_adapters_service as service;

pub use tower_adapters_core::{AdapterError, CloseEvent, ConfigError};
