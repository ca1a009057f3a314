//! Unified error type for the Shoal stack.

use shoal_chat::ChatError;
use shoal_link::LinkError;
use shoal_protocol::ProtocolError;
use shoal_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `shoal` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ShoalError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (frame encode/decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A link-level error (state machine, actor gone).
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A chat-level error.
    #[error(transparent)]
    Chat(#[from] ChatError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_link_error() {
        let err: ShoalError = LinkError::LinkDown.into();
        assert!(matches!(err, ShoalError::Link(_)));
        assert_eq!(err.to_string(), "link task is not running");
    }

    #[test]
    fn test_from_transport_error() {
        let err: ShoalError =
            TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, ShoalError::Transport(_)));
    }

    #[test]
    fn test_chat_error_preserves_link_message() {
        let err: ShoalError = ChatError::Link(LinkError::LinkDown).into();
        // Transparent wrapping all the way down.
        assert_eq!(err.to_string(), "link task is not running");
    }
}
