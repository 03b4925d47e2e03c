//! Error types surfaced by service adapters.
//!
//! Only synchronous failures are modelled here. An involuntary connection
//! loss is never returned from a call; it reaches consumers as
//! [`CloseEvent::Reset`](crate::CloseEvent::Reset) through the close notifier.

/// Type-erased backend error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The dial policy reported that no attempts remain.
    #[error("dial failed after {attempts} attempt(s): {source}")]
    DialExhausted {
        /// Number of connect attempts made.
        attempts: u32,
        /// The error returned by the last connect attempt.
        #[source]
        source: BoxError,
    },

    /// `dial` was called while a connection is already established.
    #[error("already connected")]
    AlreadyConnected,

    /// The operation needs a live connection but the adapter is disconnected.
    #[error("connection closed")]
    ConnectionClosed,

    /// A recognized setting carried a malformed value.
    #[error(transparent)]
    ConfigInvalid(#[from] ConfigError),
}

impl AdapterError {
    /// Returns true if this is a dial exhaustion (the timeout condition).
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AdapterError::DialExhausted { .. })
    }

    /// Returns true if `dial` found the adapter already connected.
    pub fn is_already_connected(&self) -> bool {
        matches!(self, AdapterError::AlreadyConnected)
    }

    /// Returns true if the adapter was disconnected.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, AdapterError::ConnectionClosed)
    }

    /// Returns the configuration error, if any.
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            AdapterError::ConfigInvalid(err) => Some(err),
            _ => None,
        }
    }
}

/// A recognized setting had a value that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for setting '{key}': {value} ({reason})")]
pub struct ConfigError {
    key: String,
    value: String,
    reason: String,
}

impl ConfigError {
    /// Creates a new configuration error for `key`.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The offending setting key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The rejected raw value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Why the value was rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
