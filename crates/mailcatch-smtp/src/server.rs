//! The listening socket behind a trait seam.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// The coordinator's seam to the SMTP listening socket.
///
/// Implementations own at most one binding at a time; `start` replaces any
/// prior binding. The coordinator never touches sockets directly, which
/// keeps the lifecycle state machine testable without real ports.
pub trait SmtpServer: Send + Sync + 'static {
    /// Binds the listener, returning the actual bound address.
    ///
    /// Binding to port 0 picks an ephemeral port, reported in the return
    /// value.
    fn start(&self, addr: SocketAddr) -> impl Future<Output = Result<SocketAddr>> + Send;

    /// Releases the bound socket, if any. Safe to call when not bound.
    fn stop(&self) -> impl Future<Output = ()> + Send;
}

impl<T> SmtpServer for Arc<T>
where
    T: SmtpServer,
{
    fn start(&self, addr: SocketAddr) -> impl Future<Output = Result<SocketAddr>> + Send {
        T::start(self.as_ref(), addr)
    }

    fn stop(&self) -> impl Future<Output = ()> + Send {
        T::stop(self.as_ref())
    }
}

/// A bound listener and its accept loop.
#[derive(Debug)]
struct Bound {
    addr: SocketAddr,
    accept_loop: JoinHandle<()>,
}

/// TCP listener handing accepted SMTP connections to the capture pipeline.
///
/// The SMTP dialogue itself happens on the receiving end of the
/// connection channel; this type only owns the socket.
#[derive(Debug)]
pub struct CaptureSmtpServer {
    connections: mpsc::Sender<(TcpStream, SocketAddr)>,
    bound: Mutex<Option<Bound>>,
}

impl CaptureSmtpServer {
    /// Creates a server delivering accepted connections to `connections`.
    #[must_use]
    pub const fn new(connections: mpsc::Sender<(TcpStream, SocketAddr)>) -> Self {
        Self {
            connections,
            bound: Mutex::const_new(None),
        }
    }

    /// Returns the currently bound address, if listening.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.lock().await.as_ref().map(|bound| bound.addr)
    }
}

impl SmtpServer for CaptureSmtpServer {
    fn start(&self, addr: SocketAddr) -> impl Future<Output = Result<SocketAddr>> + Send {
        async move {
            let mut bound = self.bound.lock().await;
            if let Some(previous) = bound.take() {
                release(previous).await;
            }

            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| Error::Bind { addr, source })?;
            let local = listener
                .local_addr()
                .map_err(|source| Error::Bind { addr, source })?;

            let connections = self.connections.clone();
            let accept_loop = tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, peer)) => {
                            if connections.send((stream, peer)).await.is_err() {
                                tracing::debug!("capture pipeline gone, closing accept loop");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to accept SMTP connection");
                        }
                    }
                }
            });

            *bound = Some(Bound {
                addr: local,
                accept_loop,
            });
            Ok(local)
        }
    }

    fn stop(&self) -> impl Future<Output = ()> + Send {
        async move {
            if let Some(previous) = self.bound.lock().await.take() {
                release(previous).await;
            }
        }
    }
}

/// Cancels an accept loop and waits until its socket is actually closed.
async fn release(bound: Bound) {
    bound.accept_loop.abort();
    let _ = bound.accept_loop.await;
    tracing::debug!(addr = %bound.addr, "SMTP listener released");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ephemeral() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_start_reports_actual_bound_address() {
        let (tx, _rx) = mpsc::channel(4);
        let server = CaptureSmtpServer::new(tx);

        let addr = server.start(ephemeral()).await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr().await, Some(addr));

        server.stop().await;
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn test_accepted_connections_reach_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let server = CaptureSmtpServer::new(tx);
        let addr = server.start(ephemeral()).await.unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, peer) = rx.recv().await.unwrap();
        assert!(peer.ip().is_loopback());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_releases_the_port() {
        let (tx, _rx) = mpsc::channel(4);
        let server = CaptureSmtpServer::new(tx);

        let addr = server.start(ephemeral()).await.unwrap();
        server.stop().await;

        let rebound = server.start(addr).await.unwrap();
        assert_eq!(rebound, addr);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_start_replaces_prior_binding() {
        let (tx, _rx) = mpsc::channel(4);
        let server = CaptureSmtpServer::new(tx);

        let first = server.start(ephemeral()).await.unwrap();
        let second = server.start(ephemeral()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(server.local_addr().await, Some(second));

        // The first port is free again once replaced.
        let listener = TcpListener::bind(first).await.unwrap();
        drop(listener);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_bind_failure_is_an_error_value() {
        let occupied = TcpListener::bind(ephemeral()).await.unwrap();
        let addr = occupied.local_addr().unwrap();

        let (tx, _rx) = mpsc::channel(4);
        let server = CaptureSmtpServer::new(tx);

        let result = server.start(addr).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
        assert_eq!(server.local_addr().await, None);
    }
}
