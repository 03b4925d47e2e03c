//! Adapter settings and live reconfiguration.
//!
//! Settings arrive as a flat string mapping. Each adapter's [`Settings`] type
//! picks out the keys it recognizes and ignores the rest. A malformed value
//! for a recognized key fails the whole application; adapters apply onto a
//! staged copy, so nothing scanned before the failure sticks.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tower_adapters_core::ConfigError;

use crate::tcp::TcpTarget;

/// A parsed settings mapping.
pub type SettingsMap = HashMap<String, String>;

/// Backend-specific configuration of an adapter.
///
/// The `Debug` output is logged on every change, so implementations must
/// mask secrets there.
pub trait Settings: Clone + fmt::Debug + Send + Sync + 'static {
    /// What the connector is asked to dial.
    type Target: Send + 'static;

    /// Merges recognized keys from `params`, returning whether any value changed.
    fn apply(&mut self, params: &SettingsMap) -> Result<bool, ConfigError>;

    /// The dial target for the current settings.
    fn target(&self) -> Self::Target;
}

/// Parses the value for `key`, if present.
pub fn parse_setting<T>(params: &SettingsMap, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    params
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|err: T::Err| ConfigError::new(key, raw.as_str(), err.to_string()))
        })
        .transpose()
}

/// Assigns `value` to `field`, returning whether it differed.
pub fn update_field<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

fn parse_seconds(params: &SettingsMap, key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_setting::<u64>(params, key)?.map(Duration::from_secs))
}

/// A single `endpoint` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    endpoint: String,
}

impl EndpointSettings {
    /// Creates settings pointing at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Settings for EndpointSettings {
    type Target = String;

    fn apply(&mut self, params: &SettingsMap) -> Result<bool, ConfigError> {
        Ok(match params.get("endpoint") {
            Some(endpoint) => update_field(&mut self.endpoint, endpoint.clone()),
            None => false,
        })
    }

    fn target(&self) -> String {
        self.endpoint.clone()
    }
}

/// A cluster of hosts under the `hosts` key, comma separated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterSettings {
    hosts: Vec<String>,
}

impl ClusterSettings {
    /// Creates settings for the given hosts.
    pub fn new<I, H>(hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured hosts.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn split_hosts(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Settings for ClusterSettings {
    type Target = Vec<String>;

    fn apply(&mut self, params: &SettingsMap) -> Result<bool, ConfigError> {
        let Some(raw) = params.get("hosts") else {
            return Ok(false);
        };

        let hosts = Self::split_hosts(raw);
        if hosts.is_empty() {
            return Err(ConfigError::new("hosts", raw.as_str(), "no hosts defined"));
        }
        Ok(update_field(&mut self.hosts, hosts))
    }

    fn target(&self) -> Vec<String> {
        self.hosts.clone()
    }
}

/// TCP endpoint plus connect timeout.
///
/// Recognized keys: `endpoint`, `connTimeout` (whole seconds, `0` disables
/// the timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSettings {
    endpoint: String,
    connect_timeout: Duration,
}

impl TcpSettings {
    /// Creates settings for `endpoint` with a one second connect timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(1),
        }
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Settings for TcpSettings {
    type Target = TcpTarget;

    fn apply(&mut self, params: &SettingsMap) -> Result<bool, ConfigError> {
        let timeout = parse_seconds(params, "connTimeout")?;

        let mut changed = false;
        if let Some(endpoint) = params.get("endpoint") {
            changed |= update_field(&mut self.endpoint, endpoint.clone());
        }
        if let Some(timeout) = timeout {
            changed |= update_field(&mut self.connect_timeout, timeout);
        }
        Ok(changed)
    }

    fn target(&self) -> TcpTarget {
        TcpTarget {
            addr: self.endpoint.clone(),
            timeout: self.connect_timeout,
        }
    }
}

/// Endpoint with credentials, database index and connect timeout.
///
/// Recognized keys: `endpoint`, `password`, `db` (non-negative integer),
/// `connTimeout` (whole seconds).
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSettings {
    endpoint: String,
    password: String,
    db: u32,
    connect_timeout: Duration,
}

impl CredentialSettings {
    /// Creates settings for `endpoint`: no password, database 0, one second timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            password: String::new(),
            db: 0,
            connect_timeout: Duration::from_secs(1),
        }
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the database index.
    pub fn db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The password, if one is set.
    pub fn secret(&self) -> Option<&str> {
        (!self.password.is_empty()).then_some(self.password.as_str())
    }

    /// The database index.
    pub fn db_index(&self) -> u32 {
        self.db
    }

    /// The connect timeout.
    pub fn timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("endpoint", &self.endpoint)
            .field("password", &"*".repeat(self.password.len()))
            .field("db", &self.db)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Settings for CredentialSettings {
    type Target = CredentialSettings;

    fn apply(&mut self, params: &SettingsMap) -> Result<bool, ConfigError> {
        // parse everything before touching a field
        let db = parse_setting::<u32>(params, "db")?;
        let timeout = parse_seconds(params, "connTimeout")?;

        let mut changed = false;
        if let Some(endpoint) = params.get("endpoint") {
            changed |= update_field(&mut self.endpoint, endpoint.clone());
        }
        if let Some(password) = params.get("password") {
            changed |= update_field(&mut self.password, password.clone());
        }
        if let Some(db) = db {
            changed |= update_field(&mut self.db, db);
        }
        if let Some(timeout) = timeout {
            changed |= update_field(&mut self.connect_timeout, timeout);
        }
        Ok(changed)
    }

    fn target(&self) -> CredentialSettings {
        self.clone()
    }
}
