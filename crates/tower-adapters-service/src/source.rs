//! Feeding settings from an external configuration source.
//!
//! A configuration source (a file watcher, a key-value store subscription)
//! pushes whole settings mappings into a channel; [`spawn_config_feed`]
//! applies each one to an adapter in arrival order.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::Service;
use tower_adapters_core::{BoxError, ConfigError};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::service::ServiceCore;
use crate::settings::{Settings, SettingsMap};

/// Something that accepts settings mappings.
pub trait ConfigSink: Send + Sync {
    /// Applies `params`, returning whether anything changed.
    fn apply<'a>(&'a self, params: &'a SettingsMap) -> BoxFuture<'a, Result<bool, ConfigError>>;
}

impl<S, M> ConfigSink for ServiceCore<S, M>
where
    S: Settings,
    M: Service<S::Target> + Send + 'static,
    M::Response: Connection,
    M::Error: Into<BoxError>,
    M::Future: Send,
{
    fn apply<'a>(&'a self, params: &'a SettingsMap) -> BoxFuture<'a, Result<bool, ConfigError>> {
        Box::pin(self.config(params))
    }
}

impl<T: ConfigSink + ?Sized> ConfigSink for Arc<T> {
    fn apply<'a>(&'a self, params: &'a SettingsMap) -> BoxFuture<'a, Result<bool, ConfigError>> {
        (**self).apply(params)
    }
}

/// Applies every mapping received on `updates` to `sink`.
///
/// Rejected mappings are logged and skipped. The task ends when all senders
/// are dropped.
pub fn spawn_config_feed<C>(sink: C, mut updates: mpsc::Receiver<SettingsMap>) -> JoinHandle<()>
where
    C: ConfigSink + 'static,
{
    tokio::spawn(async move {
        while let Some(params) = updates.recv().await {
            match sink.apply(&params).await {
                Ok(changed) => debug!(changed, keys = params.len(), "configuration update applied"),
                Err(err) => warn!(error = %err, "configuration update rejected"),
            }
        }
        debug!("configuration feed closed");
    })
}
