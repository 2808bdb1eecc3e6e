//! Event listener: the accepting half of the protocol.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use mailcatch_core::Event;

use crate::codec;
use crate::connection::IpcStream;
use crate::error::Result;
use crate::protocol::{ACK, GREETING, MAX_BODY_SIZE, ProtocolCommand, ProtocolRequest, REFUSED, REPLY};

/// Receives decoded events from the listener.
///
/// Returning `Some` from [`EventSink::accept`] sends that event back as the
/// reply on `Exchange` commands; `Publish` commands ignore the return value.
pub trait EventSink: Send + Sync + 'static {
    /// Handles one received event.
    fn accept(&self, event: Event) -> impl Future<Output = Option<Event>> + Send;
}

/// Accepts loopback connections and runs one exchange per connection.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let inner = TcpListener::bind((host, port)).await?;
        Ok(Self { inner })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Serves exchanges until the accept loop fails.
    ///
    /// Each connection is handled on its own task; a connection that
    /// violates the protocol is logged and dropped without affecting the
    /// loop.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting a connection fails.
    pub async fn serve<H>(self, sink: Arc<H>) -> Result<()>
    where
        H: EventSink,
    {
        loop {
            let (socket, peer) = self.inner.accept().await?;
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                if let Err(e) = handle_exchange(socket, sink).await {
                    tracing::debug!(error = %e, %peer, "exchange connection failed");
                }
            });
        }
    }
}

/// Runs the accepting half of one exchange over a fresh connection.
async fn handle_exchange<H>(socket: TcpStream, sink: Arc<H>) -> Result<()>
where
    H: EventSink,
{
    let mut stream = IpcStream::new(socket);

    stream.write_line(GREETING).await?;

    let request: ProtocolRequest = serde_json::from_str(&stream.read_line().await?)?;
    if request.byte_size > MAX_BODY_SIZE {
        tracing::warn!(byte_size = request.byte_size, "refusing oversized event body");
        stream.write_line(REFUSED).await?;
        return stream.shutdown().await;
    }
    stream.write_line(ACK).await?;

    let body = stream.read_exact(request.byte_size).await?;
    let event = codec::decode_as(&request.event, &body)?;
    tracing::debug!(kind = request.event.as_str(), command = ?request.command, "received event");

    let reply = sink.accept(event).await;

    if request.command == ProtocolCommand::Exchange
        && let Some(reply) = reply
    {
        stream.write_line(REPLY).await?;
        stream.write_line(&codec::encode(&reply)?).await?;
    }

    stream.shutdown().await
}
