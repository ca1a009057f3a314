//! Frame layout: one ASCII status digit plus an optional JSON payload.

use serde::Serialize;
use serde_json::Value;

use crate::ProtocolError;

/// The status digit leading every gateway frame.
///
/// `Open`, `Close`, `Ping`, `Pong`, `Upgrade`, and `Noop` frames carry
/// gateway/session semantics; `Message` frames wrap a
/// [`MethodCall`](crate::MethodCall) envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketStatus {
    /// Gateway session opened; payload carries session id and ping config.
    Open = 0,
    /// Gateway session closed.
    Close = 1,
    /// Keep-alive probe.
    Ping = 2,
    /// Keep-alive reply.
    Pong = 3,
    /// A method-call envelope (`kiwi.*` or `irc.*`).
    Message = 4,
    /// Transport upgrade request, sent once after the socket opens.
    Upgrade = 5,
    /// Filler frame; ignored.
    Noop = 6,
}

impl PacketStatus {
    /// Maps a wire digit to a status. `None` for digits outside `0..=6`.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Message),
            5 => Some(Self::Upgrade),
            6 => Some(Self::Noop),
            _ => None,
        }
    }

    /// The wire digit for this status.
    pub fn digit(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
        };
        write!(f, "{name}")
    }
}

/// One parsed gateway frame: status digit plus JSON payload.
///
/// A bare frame (no payload text) decodes to an empty JSON object,
/// mirroring the gateway's own parser. A `Null` payload encodes to the
/// bare digit.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The leading status digit.
    pub status: PacketStatus,
    /// The JSON document following the digit, `{}` when absent.
    pub payload: Value,
}

impl Frame {
    /// A payload-less frame: just the status digit on the wire.
    pub fn bare(status: PacketStatus) -> Self {
        Self {
            status,
            payload: Value::Null,
        }
    }

    /// A `Message` frame wrapping the given payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the payload cannot be
    /// represented as JSON.
    pub fn message<T: Serialize>(payload: &T) -> Result<Self, ProtocolError> {
        Ok(Self {
            status: PacketStatus::Message,
            payload: serde_json::to_value(payload)
                .map_err(ProtocolError::Encode)?,
        })
    }

    /// Serializes to wire text: `statusDigit + JSON(payload)`.
    pub fn encode(&self) -> String {
        match &self.payload {
            Value::Null => self.status.digit().to_string(),
            payload => format!("{}{}", self.status.digit(), payload),
        }
    }

    /// Parses wire text into a frame.
    ///
    /// The remainder after the digit is parsed as JSON; an empty
    /// remainder becomes `{}`. Malformed input is an error the caller
    /// logs and drops — a bad frame never takes the connection down.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let first = chars.next().ok_or_else(|| {
            ProtocolError::Malformed("empty frame".into())
        })?;
        let digit = first.to_digit(10).ok_or_else(|| {
            ProtocolError::Malformed(format!(
                "status byte {first:?} is not a digit"
            ))
        })? as u8;
        let status = PacketStatus::from_digit(digit)
            .ok_or(ProtocolError::UnknownStatus(digit))?;

        let rest = chars.as_str();
        let payload = if rest.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(rest).map_err(ProtocolError::Decode)?
        };

        Ok(Self { status, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_digit_round_trip() {
        for digit in 0..=6 {
            let status = PacketStatus::from_digit(digit).unwrap();
            assert_eq!(status.digit(), digit);
        }
    }

    #[test]
    fn test_status_rejects_out_of_range_digit() {
        assert_eq!(PacketStatus::from_digit(7), None);
        assert_eq!(PacketStatus::from_digit(9), None);
    }

    #[test]
    fn test_bare_frame_encodes_to_single_digit() {
        assert_eq!(Frame::bare(PacketStatus::Pong).encode(), "3");
        assert_eq!(Frame::bare(PacketStatus::Upgrade).encode(), "5");
    }

    #[test]
    fn test_message_frame_encodes_digit_then_json() {
        let frame = Frame::message(&json!({"method": "kiwi.heartbeat"}))
            .unwrap();
        assert_eq!(frame.encode(), r#"4{"method":"kiwi.heartbeat"}"#);
    }

    #[test]
    fn test_decode_open_frame_with_payload() {
        let frame = Frame::decode(r#"0{"sid":"abc","pingInterval":5000}"#)
            .unwrap();
        assert_eq!(frame.status, PacketStatus::Open);
        assert_eq!(frame.payload["sid"], "abc");
        assert_eq!(frame.payload["pingInterval"], 5000);
    }

    #[test]
    fn test_decode_bare_frame_yields_empty_object() {
        let frame = Frame::decode("2").unwrap();
        assert_eq!(frame.status, PacketStatus::Ping);
        assert_eq!(frame.payload, json!({}));
    }

    #[test]
    fn test_decode_empty_input_is_malformed() {
        assert!(matches!(
            Frame::decode(""),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_non_digit_status_is_malformed() {
        assert!(matches!(
            Frame::decode("x{}"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_unknown_status_digit() {
        assert!(matches!(
            Frame::decode("8{}"),
            Err(ProtocolError::UnknownStatus(8))
        ));
    }

    #[test]
    fn test_decode_garbage_payload_is_decode_error() {
        assert!(matches!(
            Frame::decode("4{not json"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let frame = Frame::message(&json!({
            "method": "irc.privmsg",
            "params": [7, {"target": "#fish", "msg": "hi"}, null],
        }))
        .unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }
}
