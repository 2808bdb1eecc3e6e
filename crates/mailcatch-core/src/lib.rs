//! # mailcatch-core
//!
//! Shared domain types for the Mailcatch email-capture tool:
//!
//! - Domain events exchanged between the capture service and the UI process
//! - SMTP listener settings
//! - In-process broadcast event bus
//!
//! This crate performs no I/O. The wire protocol lives in `mailcatch-ipc`,
//! the SMTP listener lifecycle in `mailcatch-smtp`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod bus;
mod event;
mod settings;

pub use bus::EventBus;
pub use event::Event;
pub use settings::SmtpSettings;
