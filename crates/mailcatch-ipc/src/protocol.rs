//! Handshake tokens, request envelope, and client-side framing.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use mailcatch_core::Event;

use crate::codec;
use crate::connection::IpcStream;
use crate::error::Result;

/// Greeting token the listening side sends on connect.
pub const GREETING: &str = "PAPERCUT";

/// Acknowledgment token accepting a request envelope.
pub const ACK: &str = "ACK";

/// Token announcing a reply event on an exchange.
pub const REPLY: &str = "REPLY";

/// Refusal token sent instead of [`ACK`].
pub const REFUSED: &str = "NO";

/// Both processes live on the local host.
pub const LOCALHOST: &str = "127.0.0.1";

/// Port the UI process listens on; the service dials it.
pub const CLIENT_PORT: u16 = 37402;

/// Port the capture service listens on; the UI dials it.
pub const SERVER_PORT: u16 = 37403;

/// Largest event body a listener will accept.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Exchange semantics requested by the dialing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolCommand {
    /// Fire-and-forget delivery; no reply expected.
    Publish,
    /// Request/response delivery; the caller waits for an optional reply.
    Exchange,
}

/// Request envelope sent once per session, immediately after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRequest {
    /// Requested exchange semantics.
    pub command: ProtocolCommand,
    /// Discriminator of the event about to be transmitted.
    pub event: String,
    /// Exact length of the body that follows an acknowledgment.
    pub byte_size: usize,
}

/// How the peer received an event.
///
/// Everything here is an expected outcome; stream failures are reported
/// separately as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handshake and envelope accepted, body fully written.
    Accepted,
    /// The greeting line was not the expected token. Not retried.
    HandshakeMismatch,
    /// The peer declined the request envelope.
    NotAcknowledged,
}

/// Performs the client half of one exchange up to and including the body.
///
/// Reads the greeting, sends the request envelope, and on acknowledgment
/// writes the encoded event body. The caller handles any reply phase.
///
/// # Errors
///
/// Returns an error on stream failure or if the event cannot be encoded.
pub async fn send_event<S>(
    stream: &mut IpcStream<S>,
    command: ProtocolCommand,
    event: &Event,
) -> Result<SendOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting = stream.read_line().await?;
    if greeting != GREETING {
        tracing::debug!(greeting, "unexpected greeting from remote");
        return Ok(SendOutcome::HandshakeMismatch);
    }

    let body = codec::encode(event)?;
    let request = ProtocolRequest {
        command,
        event: event.kind().to_string(),
        byte_size: body.len(),
    };
    stream.write_line(&serde_json::to_string(&request)?).await?;

    let response = stream.read_line().await?;
    if response != ACK {
        return Ok(SendOutcome::NotAcknowledged);
    }

    stream.write_all(body.as_bytes()).await?;
    Ok(SendOutcome::Accepted)
}
