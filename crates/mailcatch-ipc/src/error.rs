//! Error types for the exchange protocol.

use std::io;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures on the exchange path.
///
/// Expected outcomes (no listener, a mismatched greeting, a peer that
/// declines) are not errors; they surface as `false`/`None` results from
/// the exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Event or envelope (de)serialization failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer violated the protocol framing.
    #[error("protocol error: {0}")]
    Protocol(String),
}
