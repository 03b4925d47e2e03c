//! Core infrastructure for tower-adapters.
//!
//! This crate provides the pieces shared by every service adapter:
//! - Event system for observing connection lifecycles
//! - [`CloseNotifier`], the one-shot close notification fan-out
//! - The error taxonomy surfaced by adapters

pub mod error;
pub mod events;
pub mod notify;

pub use error::{AdapterError, BoxError, ConfigError};
pub use events::{EventListener, EventListeners, FnListener, LifecycleEvent};
pub use notify::{CloseEvent, CloseListener, CloseNotifier};
