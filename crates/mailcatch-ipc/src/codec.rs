//! Event encoding for the wire.
//!
//! Events travel as compact JSON with the kind discriminator embedded in
//! the payload (`"type"` tag), so the receiving end selects the decode
//! target from the payload alone. Compact JSON never contains raw
//! newlines, which keeps encoded events safe to send as single lines.

use mailcatch_core::Event;

use crate::error::{Error, Result};

/// Encodes an event to its self-describing wire form.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(event: &Event) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes an event from its wire form.
///
/// # Errors
///
/// Returns an error if the payload is malformed or carries an unknown
/// discriminator.
pub fn decode(bytes: &[u8]) -> Result<Event> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes an event and validates it against an announced discriminator.
///
/// The request envelope names the event kind before the body arrives; a
/// payload whose embedded tag disagrees is a framing violation.
///
/// # Errors
///
/// Returns an error if decoding fails or the kinds disagree.
pub fn decode_as(kind: &str, bytes: &[u8]) -> Result<Event> {
    let event = decode(bytes)?;
    if event.kind() != kind {
        return Err(Error::Protocol(format!(
            "announced event kind {kind:?} does not match payload kind {:?}",
            event.kind()
        )));
    }
    Ok(event)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use mailcatch_core::SmtpSettings;
    use proptest::prelude::*;

    use super::*;

    fn ip_strategy() -> impl Strategy<Value = IpAddr> {
        any::<[u8; 4]>().prop_map(|o| IpAddr::V4(Ipv4Addr::new(o[0], o[1], o[2], o[3])))
    }

    fn settings_strategy() -> impl Strategy<Value = SmtpSettings> {
        (ip_strategy(), any::<u16>()).prop_map(|(ip, port)| SmtpSettings::new(ip, port))
    }

    fn event_strategy() -> impl Strategy<Value = Event> {
        prop_oneof![
            "[a-zA-Z0-9-]{1,32}".prop_map(|id| Event::NewMessage { id }),
            Just(Event::ClientReady),
            Just(Event::ClientExit),
            (settings_strategy(), settings_strategy())
                .prop_map(|(previous, new)| Event::SettingsUpdated { previous, new }),
            (ip_strategy(), any::<u16>())
                .prop_map(|(ip, port)| Event::SmtpServerBound { ip, port }),
            Just(Event::SmtpServerBindFailed),
        ]
    }

    proptest! {
        #[test]
        fn test_round_trip(event in event_strategy()) {
            let encoded = encode(&event).unwrap();
            let decoded = decode(encoded.as_bytes()).unwrap();
            prop_assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_encoded_form_is_single_line() {
        let event = Event::NewMessage {
            id: "line\nbreak".into(),
        };
        let encoded = encode(&event).unwrap();
        assert!(!encoded.contains('\n'));
        assert_eq!(decode(encoded.as_bytes()).unwrap(), event);
    }

    #[test]
    fn test_decode_as_accepts_matching_kind() {
        let event = Event::NewMessage { id: "abc".into() };
        let encoded = encode(&event).unwrap();
        let decoded = decode_as("NewMessage", encoded.as_bytes()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_as_rejects_mismatched_kind() {
        let encoded = encode(&Event::ClientReady).unwrap();
        let result = decode_as("NewMessage", encoded.as_bytes());
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let result = decode(br#"{"type":"MessageVanished"}"#);
        assert!(matches!(result, Err(Error::Codec(_))));
    }
}
