//! Error types for the link layer.

use shoal_protocol::ConnectionState;

/// Errors surfaced through [`LinkHandle`](crate::LinkHandle) calls.
///
/// Transport and protocol failures are not here: those are handled
/// inside the actor (logged, or turned into a `disconnect` event) and
/// never propagate to callers.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link actor task has stopped.
    #[error("link task is not running")]
    LinkDown,

    /// `open` was called while a connection already exists.
    #[error("open requested while connection is {0}")]
    AlreadyOpen(ConnectionState),
}
