//! The backend connection contract.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tower_adapters_core::CloseEvent;

/// How a backend reported the end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The backend shut the connection down in an orderly way.
    Clean,

    /// The connection was lost.
    Abrupt,
}

impl From<Shutdown> for CloseEvent {
    fn from(shutdown: Shutdown) -> Self {
        match shutdown {
            Shutdown::Clean => CloseEvent::Closed,
            Shutdown::Abrupt => CloseEvent::Reset,
        }
    }
}

/// One-shot signal resolving when the backend ends a connection.
pub type CloseSignal = BoxFuture<'static, Shutdown>;

/// A live backend connection owned by an adapter.
///
/// Connections are produced by a connector, which is any
/// `tower::Service<Target>` whose response implements this trait.
pub trait Connection: Send + 'static {
    /// Releases the connection. Dropping it afterwards must be safe.
    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    /// Subscribes to the backend's own close notification.
    ///
    /// Called once right after a successful connect. Returning `None` means the
    /// backend cannot report closes asynchronously and no watchdog is started.
    fn close_signal(&mut self) -> Option<CloseSignal> {
        None
    }
}

/// Creates a close signal driven by a oneshot sender.
///
/// Dropping the sender without sending counts as an abrupt loss.
pub fn close_signal() -> (oneshot::Sender<Shutdown>, CloseSignal) {
    let (tx, rx) = oneshot::channel();
    let signal = rx.map(|res| res.unwrap_or(Shutdown::Abrupt)).boxed();
    (tx, signal)
}
