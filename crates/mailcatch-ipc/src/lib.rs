//! # mailcatch-ipc
//!
//! Loopback TCP event exchange between the Mailcatch capture service and
//! the desktop UI process. One connection carries exactly one exchange:
//!
//! ```text
//! Client connects to <host>:<port>
//! Server -> Client: "PAPERCUT\n"
//! Client -> Server: {"command":..,"event":..,"byteSize":..}\n
//! Server -> Client: "ACK\n" | other
//! Client -> Server: <byteSize> raw bytes of event body     (only if ACK)
//! [Exchange] Server -> Client: "REPLY\n" | other
//! [Exchange, if REPLY] Server -> Client: <encoded reply event>\n
//! ```
//!
//! Two exchange semantics are offered by [`Client`]:
//!
//! - [`Client::publish`]: fire-and-forget; `Ok(false)` when no listener is
//!   present, the greeting mismatches, or the peer declines
//! - [`Client::exchange`]: request/response; `Ok(None)` in the same soft
//!   cases or when the peer sends no reply
//!
//! Soft outcomes are values, never errors: only genuine transport faults
//! (reset connections, malformed streams) surface as [`Error`]. The peer
//! half lives in [`Listener`], which dispatches decoded events to an
//! [`EventSink`].
//!
//! The protocol trusts any loopback caller; there is no authentication and
//! no multiplexing.
//!
//! ## Modules
//!
//! - [`codec`]: event encoding/decoding
//! - [`connection`]: stream framing and single-use transport sessions
//! - [`protocol`]: handshake tokens, request envelope, client-side framing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
pub mod codec;
pub mod connection;
mod error;
pub mod protocol;
mod server;

pub use client::Client;
pub use connection::{IpcStream, TransportSession};
pub use error::{Error, Result};
pub use protocol::{CLIENT_PORT, LOCALHOST, SERVER_PORT, ProtocolCommand, ProtocolRequest};
pub use server::{EventSink, Listener};
