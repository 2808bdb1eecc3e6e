//! Stream framing and per-exchange transport sessions.

mod session;
mod stream;

pub use session::TransportSession;
pub use stream::IpcStream;
