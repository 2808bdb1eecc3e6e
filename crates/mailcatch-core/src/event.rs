//! Domain events exchanged between the capture service and the UI process.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::SmtpSettings;

/// An event flowing through the local bus or across the loopback protocol.
///
/// The set of kinds is closed: each variant carries a stable `"type"`
/// discriminator in its serialized form, and decoding an unknown
/// discriminator fails. Events have no persisted identity; they are created
/// by application logic and dropped once an exchange completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A captured message was stored under the given id.
    NewMessage {
        /// Store-assigned message id.
        id: String,
    },
    /// The UI process finished starting up.
    ClientReady,
    /// The UI process is shutting down.
    ClientExit,
    /// The SMTP listener settings changed.
    SettingsUpdated {
        /// Settings in effect before the change.
        previous: SmtpSettings,
        /// Settings in effect after the change.
        new: SmtpSettings,
    },
    /// The SMTP listener bound successfully.
    SmtpServerBound {
        /// Address the listener is bound to.
        ip: IpAddr,
        /// Port the listener is bound to.
        port: u16,
    },
    /// The SMTP listener exhausted its bind attempts.
    SmtpServerBindFailed,
}

impl Event {
    /// Returns the stable discriminator for this event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "NewMessage",
            Self::ClientReady => "ClientReady",
            Self::ClientExit => "ClientExit",
            Self::SettingsUpdated { .. } => "SettingsUpdated",
            Self::SmtpServerBound { .. } => "SmtpServerBound",
            Self::SmtpServerBindFailed => "SmtpServerBindFailed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_serialized_tag() {
        let events = [
            Event::NewMessage { id: "abc".into() },
            Event::ClientReady,
            Event::ClientExit,
            Event::SettingsUpdated {
                previous: SmtpSettings::default(),
                new: SmtpSettings::default(),
            },
            Event::SmtpServerBound {
                ip: "127.0.0.1".parse().unwrap(),
                port: 2525,
            },
            Event::SmtpServerBindFailed,
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }

    #[test]
    fn test_unit_variant_serializes_as_bare_tag() {
        let json = serde_json::to_string(&Event::ClientReady).unwrap();
        assert_eq!(json, r#"{"type":"ClientReady"}"#);
    }

    #[test]
    fn test_unknown_tag_fails_to_decode() {
        let result = serde_json::from_str::<Event>(r#"{"type":"Bogus"}"#);
        assert!(result.is_err());
    }
}
