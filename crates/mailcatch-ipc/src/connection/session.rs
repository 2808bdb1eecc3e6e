//! Per-exchange transport sessions.

use std::io;

use tokio::net::TcpStream;

use super::IpcStream;
use crate::error::Result;

/// One TCP connection, owned for the lifetime of a single exchange.
///
/// A session is single-use: [`TransportSession::run`] consumes it, so every
/// publish or exchange call opens a fresh connection and no state is shared
/// between concurrent calls.
#[derive(Debug)]
pub struct TransportSession {
    stream: IpcStream<TcpStream>,
}

impl TransportSession {
    /// Connects to a peer.
    ///
    /// A refused connection means no listener is present on the other end,
    /// an expected outcome returned as `Ok(None)` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error for any connect failure other than refusal.
    pub async fn open(host: &str, port: u16) -> Result<Option<Self>> {
        match TcpStream::connect((host, port)).await {
            Ok(stream) => Ok(Some(Self {
                stream: IpcStream::new(stream),
            })),
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                tracing::debug!(host, port, "no listener on remote endpoint");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs one exchange over the session's stream.
    ///
    /// The session is consumed and the socket shut down on every exit path,
    /// whether the operation succeeds, reports a soft outcome, or fails.
    ///
    /// # Errors
    ///
    /// Returns whatever the operation returns.
    pub async fn run<T, F>(mut self, op: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut IpcStream<TcpStream>) -> Result<T>,
    {
        let result = op(&mut self.stream).await;
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(error = %e, "socket shutdown after exchange failed");
        }
        result
    }
}
