//! # mailcatch-smtp
//!
//! Ownership of the SMTP listening socket for the Mailcatch capture
//! service.
//!
//! The [`SmtpServerCoordinator`] drives the listener through an explicit
//! lifecycle:
//!
//! ```text
//! Stopped ── client ready / enabled ──→ Starting ── bind ok ──→ Listening
//!    ↑                                     │
//!    └──── disable / client exit ──────────┴── attempts exhausted ──→ Failed
//! ```
//!
//! Bind attempts run on a cancellable background task with a fixed retry
//! budget; success and exhaustion are reported as bus events
//! (`SmtpServerBound`, `SmtpServerBindFailed`), never as faults, so the
//! host process keeps running when a port is taken. Exactly one binding is
//! active at any time.
//!
//! The listener itself sits behind the [`SmtpServer`] trait;
//! [`CaptureSmtpServer`] implements it over TCP, handing accepted
//! connections to the capture pipeline through a channel. What happens on
//! those connections (the SMTP dialogue, the message store) is outside
//! this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod coordinator;
mod error;
mod server;

pub use coordinator::{CoordinatorHandle, RetryPolicy, SmtpServerCoordinator};
pub use error::{Error, Result};
pub use server::{CaptureSmtpServer, SmtpServer};
