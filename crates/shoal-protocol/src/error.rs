//! Error types for the protocol layer.

/// Errors that can occur while framing or parsing gateway traffic.
///
/// None of these are fatal to a connection: the link logs the offending
/// frame and keeps processing. See the failure-semantics notes on
/// [`Frame::decode`](crate::Frame::decode).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is structurally broken — empty, or the leading status
    /// byte is not an ASCII digit.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The status digit parsed but names no known packet status.
    #[error("unhandled packet status {0}")]
    UnknownStatus(u8),

    /// The JSON payload after the status digit failed to parse.
    #[error("payload decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Serializing an outbound payload failed.
    #[error("payload encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
