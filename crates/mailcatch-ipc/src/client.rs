//! Exchange client: the dialing half of the protocol.

use mailcatch_core::Event;

use crate::codec;
use crate::connection::TransportSession;
use crate::error::Result;
use crate::protocol::{self, CLIENT_PORT, LOCALHOST, ProtocolCommand, REPLY, SERVER_PORT, SendOutcome};

/// Dials a peer process and performs one exchange per call.
///
/// Every call opens an independent [`TransportSession`], so concurrent and
/// repeated calls are always safe; the protocol gives no ordering guarantee
/// between them.
#[derive(Debug, Clone)]
pub struct Client {
    host: String,
    port: u16,
}

impl Client {
    /// Creates a client dialing the given endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Client dialing the capture service's listener.
    #[must_use]
    pub fn to_service() -> Self {
        Self::new(LOCALHOST, SERVER_PORT)
    }

    /// Client dialing the UI process's listener.
    #[must_use]
    pub fn to_ui() -> Self {
        Self::new(LOCALHOST, CLIENT_PORT)
    }

    /// Delivers an event fire-and-forget.
    ///
    /// Returns `true` only once the body bytes are fully written. Returns
    /// `false` when no listener is present, the greeting mismatches, or the
    /// peer declines the envelope.
    ///
    /// # Errors
    ///
    /// Returns an error only on genuine transport failure.
    pub async fn publish(&self, event: &Event) -> Result<bool> {
        let Some(session) = TransportSession::open(&self.host, self.port).await? else {
            return Ok(false);
        };

        tracing::debug!(kind = event.kind(), port = self.port, "publishing event to remote");

        session
            .run(async |stream| {
                let outcome = protocol::send_event(stream, ProtocolCommand::Publish, event).await?;
                Ok(outcome == SendOutcome::Accepted)
            })
            .await
    }

    /// Delivers an event and waits for an optional reply event.
    ///
    /// Returns `None` in every soft case: no listener, greeting mismatch,
    /// no acknowledgment, or a peer that declines to reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed reply.
    pub async fn exchange(&self, event: &Event) -> Result<Option<Event>> {
        let Some(session) = TransportSession::open(&self.host, self.port).await? else {
            return Ok(None);
        };

        tracing::debug!(kind = event.kind(), port = self.port, "exchanging event with remote");

        session
            .run(async |stream| {
                match protocol::send_event(stream, ProtocolCommand::Exchange, event).await? {
                    SendOutcome::Accepted => {}
                    outcome => {
                        tracing::debug!(?outcome, "exchange not accepted by remote");
                        return Ok(None);
                    }
                }

                let response = stream.read_line().await?;
                if response != REPLY {
                    return Ok(None);
                }

                let reply = stream.read_line().await?;
                Ok(Some(codec::decode(reply.as_bytes())?))
            })
            .await
    }
}
