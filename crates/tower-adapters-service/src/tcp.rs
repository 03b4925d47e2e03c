//! A plain TCP connector.

use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tower::Service;

use crate::connection::Connection;

/// Where and how long to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpTarget {
    /// `host:port` to connect to.
    pub addr: String,
    /// Connect timeout; zero waits indefinitely.
    pub timeout: Duration,
}

/// Connector opening a [`TcpStream`] per dial.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    nodelay: bool,
}

impl TcpConnector {
    /// Creates a connector with default socket options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `TCP_NODELAY` on new connections.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Service<TcpTarget> for TcpConnector {
    type Response = TcpConnection;
    type Error = io::Error;
    type Future = BoxFuture<'static, io::Result<TcpConnection>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, target: TcpTarget) -> Self::Future {
        let nodelay = self.nodelay;
        Box::pin(async move {
            let connect = TcpStream::connect(target.addr.as_str());
            let stream = if target.timeout.is_zero() {
                connect.await?
            } else {
                tokio::time::timeout(target.timeout, connect)
                    .await
                    .map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("connect to {} timed out", target.addr),
                        )
                    })??
            };
            if nodelay {
                stream.set_nodelay(true)?;
            }
            Ok(TcpConnection { stream })
        })
    }
}

/// An open TCP connection.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    /// The underlying stream.
    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// The remote address.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Connection for TcpConnection {
    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            // already gone is fine
            let _ = self.stream.shutdown().await;
        })
    }
}
