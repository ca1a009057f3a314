//! Error types for the chat layer.

use shoal_link::LinkError;

/// Errors surfaced through [`ChatClient`](crate::ChatClient) calls.
///
/// Server-side IRC errors never appear here: those arrive as relayed
/// events and are mapped to listener callbacks (`on_banned`,
/// `on_error`, ...) instead.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The underlying gateway link rejected the call or has stopped.
    #[error(transparent)]
    Link(#[from] LinkError),
}
