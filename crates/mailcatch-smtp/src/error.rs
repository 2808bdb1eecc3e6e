//! Error types for SMTP listener operations.

use std::io;
use std::net::SocketAddr;

/// Result type alias for SMTP listener operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP listener error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listener could not bind its address.
    #[error("failed to bind SMTP listener on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
